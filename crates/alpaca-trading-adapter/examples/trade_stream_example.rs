/*
[INPUT]:  APCA_API_KEY_ID / APCA_API_SECRET_KEY environment variables
[OUTPUT]: Trade updates printed until Ctrl-C
[POS]:    Examples - trading stream handling
[UPDATE]: When the trading stream API changes
*/

use alpaca_trading_adapter::*;

/// Example: stream trade updates for a paper account
///
/// Place an order from the dashboard or `trading_example` while this runs
/// to see `new` / `fill` events arrive.
fn main() {
    println!("=== Alpaca Trade Stream Example ===\n");

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("Missing credentials: {}", e);
            return;
        }
    };

    let stream = TradingStream::new(StreamConfig::new(credentials));
    println!("✓ Trading stream created for {}", stream.endpoint());

    let registered = stream.subscribe_trade_updates(|event: TradeUpdateEvent| async move {
        match event {
            TradeUpdateEvent::Typed(update) => println!(
                "{} {} {:?} qty={:?} price={:?}",
                update.event, update.order.symbol, update.order.side, update.qty, update.price
            ),
            TradeUpdateEvent::Raw(data) => println!("{data}"),
        }
    });
    if let Err(e) = registered {
        eprintln!("Failed to register handler: {}", e);
        return;
    }
    println!("✓ Trade update handler registered, press Ctrl-C to stop\n");

    if let Err(e) = stream.run() {
        eprintln!("Trading stream failed: {}", e);
    }
    println!("\n✓ Trade stream example complete");
}
