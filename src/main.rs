use lob::{Order, OrderBook, Side};

fn main() {
    println!("Limit Order Book Demo");
    println!("=====================");

    let mut book = OrderBook::new();
    book.set_time(1000);

    println!("Created empty book");
    println!("Best bid: {:?}", book.best_bid());
    println!("Best ask: {:?}", book.best_ask());

    println!("\n1. Feeding resting orders...");
    for order in [
        Order::new(1, Side::Bid, 100, 4950),
        Order::new(2, Side::Bid, 200, 4940),
        Order::new(3, Side::Ask, 150, 5050),
        Order::new(4, Side::Ask, 100, 5060),
    ] {
        match book.process(order) {
            Ok(_) => println!("Processed {}", order),
            Err(e) => println!("Error processing {}: {}", order, e),
        }
    }

    println!("\nBook state:");
    println!("Best bid: {:?}", book.best_bid());
    println!("Best ask: {:?}", book.best_ask());
    println!("Spread: {:?}", book.spread());
    println!("Mid price: {:?}", book.mid_price());
    println!("Total orders: {}", book.total_orders());
    println!("Total levels: {}", book.total_levels());

    println!("\n2. Re-sizing order 1 to 150...");
    match book.process(Order::new(1, Side::Bid, 150, 4950)) {
        Ok(_) => println!("Order 1 now {:?}", book.get_order(1)),
        Err(e) => println!("Error updating order 1: {}", e),
    }

    println!("\n3. Cancelling order 2...");
    match book.process(Order::new(2, Side::Bid, 0, 4940)) {
        Ok(true) => println!("Order 2 cancelled"),
        Ok(false) => println!("Order 2 was not in the book"),
        Err(e) => println!("Error cancelling order 2: {}", e),
    }

    println!("\nFinal depth:");
    let (bids, asks) = book.levels(None);
    for level in bids {
        println!(
            "  bid {} x {} ({} orders, volume {})",
            level.price(),
            level.size(),
            level.len(),
            level.volume()
        );
    }
    for level in asks {
        println!(
            "  ask {} x {} ({} orders, volume {})",
            level.price(),
            level.size(),
            level.len(),
            level.volume()
        );
    }
}
