//! Per-connection session loop
//!
//! Each accepted socket runs one session: framed commands in, acknowledgement
//! and execution frames out. The engine does the matching; this module only
//! translates between wire records and engine calls.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use matching_engine::{MatchingEngine, NewOrder, OrderStatus, Side};
use protocol::messages::{
    CancelOrderRequest, ExecutionReport, MarketData, Message, ModifyOrderRequest, NewOrderRequest,
    OrderAck, OrderReject,
};
use protocol::MessageCodec;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Result;

type Connection = Framed<TcpStream, MessageCodec>;

/// Serve one client until it disconnects, errors, or shutdown is signalled
pub(crate) async fn run_session(
    engine: Arc<MatchingEngine>,
    stream: TcpStream,
    conn_id: u64,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut connection = Framed::new(stream, MessageCodec::new());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = connection.next() => match frame {
                Some(Ok(message)) => {
                    handle_message(&engine, &mut connection, conn_id, message).await?;
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            }
        }
    }

    Ok(())
}

async fn handle_message(
    engine: &MatchingEngine,
    connection: &mut Connection,
    conn_id: u64,
    message: Message,
) -> Result<()> {
    match message {
        Message::NewOrder(request) => handle_new_order(engine, connection, conn_id, request).await,
        Message::CancelOrder(request) => handle_cancel(engine, connection, conn_id, request).await,
        Message::ModifyOrder(request) => handle_modify(engine, connection, conn_id, request).await,
        Message::Heartbeat(heartbeat) => {
            connection.send(Message::Heartbeat(heartbeat)).await?;
            Ok(())
        }
        other => {
            warn!(conn_id, kind = ?other.kind(), "unexpected message from client");
            Ok(())
        }
    }
}

async fn handle_new_order(
    engine: &MatchingEngine,
    connection: &mut Connection,
    conn_id: u64,
    request: NewOrderRequest,
) -> Result<()> {
    debug!(
        conn_id,
        symbol = %request.symbol,
        side = %request.side,
        order_type = %request.order_type,
        quantity = request.quantity,
        "new order"
    );

    let result = engine.submit(NewOrder {
        symbol: request.symbol,
        side: request.side,
        order_type: request.order_type,
        price: request.price,
        quantity: request.quantity,
        stop_price: request.stop_price,
        client_tag: request.client_tag,
    });

    if let Some(reason) = result.rejection {
        connection
            .send(Message::OrderReject(OrderReject {
                client_order_id: request.client_order_id,
                reason: reason.to_string(),
            }))
            .await?;
        return Ok(());
    }

    connection
        .send(Message::OrderAck(OrderAck {
            client_order_id: request.client_order_id,
            order_id: result.order_id,
            status: OrderStatus::Pending,
            message: "Order accepted".into(),
        }))
        .await?;

    // one execution report per trade, remaining quantity running down;
    // the last report carries the order's final status
    let mut remaining = result.order.quantity;
    let trade_count = result.trades.len();
    for (i, trade) in result.trades.iter().enumerate() {
        remaining -= trade.quantity;
        let status = if i + 1 == trade_count {
            result.order.status
        } else {
            OrderStatus::PartiallyFilled
        };
        connection
            .send(Message::ExecutionReport(ExecutionReport {
                order_id: result.order_id,
                symbol: result.order.symbol.clone(),
                side: result.order.side,
                execution_price: trade.price,
                execution_quantity: trade.quantity,
                remaining_quantity: remaining,
                status,
                trade_id: trade.id,
            }))
            .await?;
    }

    send_market_data(engine, connection, &result.order.symbol).await
}

async fn handle_cancel(
    engine: &MatchingEngine,
    connection: &mut Connection,
    conn_id: u64,
    request: CancelOrderRequest,
) -> Result<()> {
    debug!(conn_id, order_id = request.order_id, "cancel order");

    let ack = if engine.cancel(request.order_id) {
        OrderAck {
            client_order_id: 0,
            order_id: request.order_id,
            status: OrderStatus::Cancelled,
            message: "Order cancelled".into(),
        }
    } else {
        OrderAck {
            client_order_id: 0,
            order_id: request.order_id,
            status: OrderStatus::Rejected,
            message: "Order not found".into(),
        }
    };
    connection.send(Message::OrderAck(ack)).await?;
    Ok(())
}

async fn handle_modify(
    engine: &MatchingEngine,
    connection: &mut Connection,
    conn_id: u64,
    request: ModifyOrderRequest,
) -> Result<()> {
    debug!(
        conn_id,
        order_id = request.order_id,
        price = request.new_price,
        quantity = request.new_quantity,
        "modify order"
    );

    let ack = if engine.modify(request.order_id, request.new_price, request.new_quantity) {
        OrderAck {
            client_order_id: 0,
            order_id: request.order_id,
            status: OrderStatus::Pending,
            message: "Order modified".into(),
        }
    } else {
        OrderAck {
            client_order_id: 0,
            order_id: request.order_id,
            status: OrderStatus::Rejected,
            message: "Failed to modify order".into(),
        }
    };
    connection.send(Message::OrderAck(ack)).await?;
    Ok(())
}

/// Push a top-of-book snapshot; zero prices mean the side is empty
async fn send_market_data(
    engine: &MatchingEngine,
    connection: &mut Connection,
    symbol: &str,
) -> Result<()> {
    let best_bid = engine.best_bid(symbol);
    let best_ask = engine.best_ask(symbol);
    let snapshot = MarketData {
        symbol: symbol.to_string(),
        best_bid: best_bid.unwrap_or(0),
        best_ask: best_ask.unwrap_or(0),
        bid_quantity: best_bid
            .map(|p| engine.quantity_at(symbol, Side::Buy, p))
            .unwrap_or(0),
        ask_quantity: best_ask
            .map(|p| engine.quantity_at(symbol, Side::Sell, p))
            .unwrap_or(0),
    };
    connection.send(Message::MarketData(snapshot)).await?;
    Ok(())
}
