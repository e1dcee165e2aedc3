/*
[INPUT]:  APCA_API_KEY_ID / APCA_API_SECRET_KEY environment variables
[OUTPUT]: Account summary, market clock and open orders
[POS]:    Examples - trading operations
[UPDATE]: When trading API changes
*/

use alpaca_trading_adapter::*;

/// Example: read-only trading calls against the paper environment
#[tokio::main]
async fn main() {
    println!("=== Alpaca Trading Example ===\n");

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("Missing credentials: {}", e);
            return;
        }
    };

    let client = match AlpacaClient::new(credentials, Environment::Paper) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    println!("✓ HTTP client created for {}", client.base_url());

    match client.get_account().await {
        Ok(account) => println!(
            "✓ Account {} ({}) buying power {:?}",
            account.account_number, account.status, account.buying_power
        ),
        Err(e) => eprintln!("Failed to fetch account: {}", e),
    }

    match client.get_clock().await {
        Ok(clock) => println!("✓ Market open: {} (next open {})", clock.is_open, clock.next_open),
        Err(e) => eprintln!("Failed to fetch clock: {}", e),
    }

    let filter = GetOrdersRequest {
        status: Some(QueryOrderStatus::Open),
        ..Default::default()
    };
    match client.get_orders(&filter).await {
        Ok(orders) => {
            println!("✓ {} open orders", orders.len());
            for order in orders {
                println!("  {} {} {:?} {:?}", order.id, order.symbol, order.side, order.qty);
            }
        }
        Err(e) => eprintln!("Failed to list orders: {}", e),
    }
}
