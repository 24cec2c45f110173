//! Interactive trading shell
//!
//! Speaks the wire protocol to a running server. Commands are read from
//! stdin; server events (acks, rejects, fills, book snapshots) are printed
//! as they arrive by a background task.

use std::io::Write as _;
use std::time::Duration;

use anyhow::{Context, Result};
use common::{price_from_f64, price_to_f64, Error, OrderId, Price, Quantity};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use matching_engine::{OrderType, Side};
use protocol::messages::{
    CancelOrderRequest, Message, ModifyOrderRequest, NewOrderRequest,
};
use protocol::MessageCodec;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

type WireSink = SplitSink<Framed<TcpStream, MessageCodec>, Message>;
type WireStream = SplitStream<Framed<TcpStream, MessageCodec>>;

const CLIENT_TAG: &str = "shell";

/// One parsed shell command
enum ShellCommand {
    Order {
        symbol: String,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
    },
    Cancel(OrderId),
    Modify {
        order_id: OrderId,
        price: Price,
        quantity: Quantity,
    },
    Help,
    Quit,
}

/// Connect and run the shell until `quit` or disconnect
pub async fn run(host: String, port: u16, demo: bool) -> Result<()> {
    println!("========================================");
    println!("  Matchbook Trading Shell");
    println!("========================================");
    println!();
    println!("Connecting to {}:{}...", host, port);

    let stream = TcpStream::connect((host.as_str(), port))
        .await
        .context("failed to connect; is the server running?")?;
    println!("Connected.");

    let (mut sink, stream) = Framed::new(stream, MessageCodec::new()).split();
    let printer = tokio::spawn(print_events(stream));

    let mut next_client_order_id: u64 = 1;

    if demo {
        run_demo(&mut sink, &mut next_client_order_id).await?;
    }

    print_usage();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt();
            continue;
        }

        match parse_command(line) {
            Ok(ShellCommand::Quit) => {
                println!("Disconnecting...");
                break;
            }
            Ok(ShellCommand::Help) => print_usage(),
            Ok(ShellCommand::Order {
                symbol,
                side,
                order_type,
                price,
                quantity,
            }) => {
                let client_order_id = next_client_order_id;
                next_client_order_id += 1;
                sink.send(Message::NewOrder(NewOrderRequest {
                    client_order_id,
                    symbol,
                    side,
                    order_type,
                    price,
                    quantity,
                    stop_price: 0,
                    client_tag: CLIENT_TAG.into(),
                }))
                .await?;
            }
            Ok(ShellCommand::Cancel(order_id)) => {
                sink.send(Message::CancelOrder(CancelOrderRequest {
                    order_id,
                    client_tag: CLIENT_TAG.into(),
                }))
                .await?;
            }
            Ok(ShellCommand::Modify {
                order_id,
                price,
                quantity,
            }) => {
                sink.send(Message::ModifyOrder(ModifyOrderRequest {
                    order_id,
                    new_price: price,
                    new_quantity: quantity,
                    client_tag: CLIENT_TAG.into(),
                }))
                .await?;
            }
            Err(e) => println!("Error: {}", e),
        }

        // give the server's replies a moment to print before the prompt
        tokio::time::sleep(Duration::from_millis(50)).await;
        prompt();
    }

    printer.abort();
    println!("Goodbye!");
    Ok(())
}

/// Print incoming server frames until the connection closes
async fn print_events(mut stream: WireStream) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(message) => print_event(&message),
            Err(e) => {
                eprintln!("connection error: {}", e);
                break;
            }
        }
    }
    println!("Disconnected from server.");
}

fn print_event(message: &Message) {
    match message {
        Message::OrderAck(ack) => {
            if ack.client_order_id != 0 {
                println!(
                    "[ACK] order {} (client {}): {} - {}",
                    ack.order_id, ack.client_order_id, ack.status, ack.message
                );
            } else {
                println!("[ACK] order {}: {} - {}", ack.order_id, ack.status, ack.message);
            }
        }
        Message::OrderReject(reject) => {
            println!("[REJECT] client {}: {}", reject.client_order_id, reject.reason);
        }
        Message::ExecutionReport(report) => {
            println!(
                "[FILL] order {}: {} {} @ {:.4}, remaining {} ({}, trade {})",
                report.order_id,
                report.side,
                report.execution_quantity,
                price_to_f64(report.execution_price),
                report.remaining_quantity,
                report.status,
                report.trade_id
            );
        }
        Message::MarketData(md) => {
            let bid = if md.best_bid != 0 {
                format!("{:.4} x {}", price_to_f64(md.best_bid), md.bid_quantity)
            } else {
                "-".into()
            };
            let ask = if md.best_ask != 0 {
                format!("{:.4} x {}", price_to_f64(md.best_ask), md.ask_quantity)
            } else {
                "-".into()
            };
            println!("[BOOK] {} bid {} | ask {}", md.symbol, bid, ask);
        }
        Message::Heartbeat(hb) => {
            println!("[HEARTBEAT] seq {}", hb.sequence);
        }
        other => {
            println!("[?] unexpected frame: {:?}", other.kind());
        }
    }
}

fn parse_command(line: &str) -> std::result::Result<ShellCommand, Error> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let command = tokens[0];

    match command {
        "quit" | "exit" => Ok(ShellCommand::Quit),
        "help" => Ok(ShellCommand::Help),
        "buy" | "sell" => {
            if tokens.len() < 4 {
                return Err(Error::invalid_input(format!(
                    "usage: {} <symbol> <quantity> <price>",
                    command
                )));
            }
            Ok(ShellCommand::Order {
                symbol: tokens[1].to_string(),
                side: if command == "buy" { Side::Buy } else { Side::Sell },
                order_type: OrderType::Limit,
                price: parse_price(tokens[3])?,
                quantity: parse_quantity(tokens[2])?,
            })
        }
        "market-buy" | "market-sell" => {
            if tokens.len() < 3 {
                return Err(Error::invalid_input(format!(
                    "usage: {} <symbol> <quantity>",
                    command
                )));
            }
            Ok(ShellCommand::Order {
                symbol: tokens[1].to_string(),
                side: if command == "market-buy" {
                    Side::Buy
                } else {
                    Side::Sell
                },
                order_type: OrderType::Market,
                price: 0,
                quantity: parse_quantity(tokens[2])?,
            })
        }
        "cancel" => {
            if tokens.len() < 2 {
                return Err(Error::invalid_input("usage: cancel <order_id>"));
            }
            Ok(ShellCommand::Cancel(parse_id(tokens[1])?))
        }
        "modify" => {
            if tokens.len() < 4 {
                return Err(Error::invalid_input(
                    "usage: modify <order_id> <price> <quantity>",
                ));
            }
            Ok(ShellCommand::Modify {
                order_id: parse_id(tokens[1])?,
                price: parse_price(tokens[2])?,
                quantity: parse_quantity(tokens[3])?,
            })
        }
        other => Err(Error::invalid_input(format!(
            "unknown command: {} (type 'help' for commands)",
            other
        ))),
    }
}

fn parse_price(token: &str) -> std::result::Result<Price, Error> {
    let value: f64 = token
        .parse()
        .map_err(|_| Error::invalid_input(format!("bad price: {}", token)))?;
    if value <= 0.0 {
        return Err(Error::invalid_input("price must be positive"));
    }
    Ok(price_from_f64(value))
}

fn parse_quantity(token: &str) -> std::result::Result<Quantity, Error> {
    token
        .parse()
        .map_err(|_| Error::invalid_input(format!("bad quantity: {}", token)))
}

fn parse_id(token: &str) -> std::result::Result<OrderId, Error> {
    token
        .parse()
        .map_err(|_| Error::invalid_input(format!("bad order id: {}", token)))
}

fn print_usage() {
    println!();
    println!("Available Commands:");
    println!("  buy <symbol> <quantity> <price>       - Submit a buy limit order");
    println!("  sell <symbol> <quantity> <price>      - Submit a sell limit order");
    println!("  market-buy <symbol> <quantity>        - Submit a market buy order");
    println!("  market-sell <symbol> <quantity>       - Submit a market sell order");
    println!("  cancel <order_id>                     - Cancel an order");
    println!("  modify <order_id> <price> <quantity>  - Modify an order");
    println!("  help                                  - Show this help message");
    println!("  quit                                  - Disconnect and exit");
    println!();
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Replay a scripted sequence that builds a small book and crosses it
async fn run_demo(sink: &mut WireSink, next_client_order_id: &mut u64) -> Result<()> {
    println!();
    println!("Running demo mode...");
    println!();

    let mut submit = |side: Side, order_type: OrderType, price: f64, quantity: Quantity| {
        let client_order_id = *next_client_order_id;
        *next_client_order_id += 1;
        Message::NewOrder(NewOrderRequest {
            client_order_id,
            symbol: "AAPL".into(),
            side,
            order_type,
            price: price_from_f64(price),
            quantity,
            stop_price: 0,
            client_tag: CLIENT_TAG.into(),
        })
    };

    println!("Submitting buy orders...");
    for message in [
        submit(Side::Buy, OrderType::Limit, 150.00, 100),
        submit(Side::Buy, OrderType::Limit, 149.50, 200),
        submit(Side::Buy, OrderType::Limit, 149.00, 150),
    ] {
        sink.send(message).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!("Submitting sell orders...");
    for message in [
        submit(Side::Sell, OrderType::Limit, 151.00, 100),
        submit(Side::Sell, OrderType::Limit, 151.50, 200),
    ] {
        sink.send(message).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    println!("Submitting matching order (should create trades)...");
    sink.send(submit(Side::Buy, OrderType::Limit, 151.50, 150))
        .await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("Submitting market order...");
    sink.send(submit(Side::Sell, OrderType::Market, 0.0, 50))
        .await?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!();
    println!("Demo completed.");
    Ok(())
}
