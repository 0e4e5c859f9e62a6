use std::collections::HashSet;

use crate::broker::{Deal, Position, DEAL_ENTRY_INOUT, DEAL_ENTRY_OUT};
use crate::models::{Direction, TradeRecord, TradeSource, TradeStatus};

/// Merge still-open bot-originated records with the terminal's open
/// positions and closed deals. Records are deduplicated by id; the first
/// occurrence wins.
pub fn merge_trades(
    bot_open: Vec<TradeRecord>,
    positions: &[Position],
    deals: &[Deal],
) -> Vec<TradeRecord> {
    let mut trades = bot_open;
    let mut seen: HashSet<String> = trades.iter().map(|t| t.id.clone()).collect();

    for position in positions {
        let id = format!("mt5-{}", position.ticket);
        if seen.insert(id.clone()) {
            trades.push(position_record(id, position));
        }
    }

    for deal in deals {
        if deal.entry != DEAL_ENTRY_OUT && deal.entry != DEAL_ENTRY_INOUT {
            continue;
        }
        let id = format!("mt5-closed-{}", deal.ticket);
        if seen.insert(id.clone()) {
            trades.push(deal_record(id, deal));
        }
    }

    trades
}

/// Closed trades only: terminal "out" deals, deduplicated by ticket
pub fn closed_trades(deals: &[Deal]) -> Vec<TradeRecord> {
    let mut seen = HashSet::new();
    deals
        .iter()
        .filter(|deal| deal.entry == DEAL_ENTRY_OUT)
        .filter_map(|deal| {
            let id = format!("mt5-closed-{}", deal.ticket);
            seen.insert(id.clone()).then(|| deal_record(id, deal))
        })
        .collect()
}

fn position_record(id: String, position: &Position) -> TradeRecord {
    TradeRecord {
        id,
        symbol: position.symbol.clone(),
        direction: direction_of(position.is_buy),
        entry_price: position.price_open,
        exit_price: None,
        quantity: position.volume,
        timestamp: position.time,
        status: TradeStatus::Open,
        source: TradeSource::Mt5,
        ticket: Some(position.ticket),
        current_price: Some(position.price_current),
        profit: Some(position.profit),
        commission: None,
    }
}

fn deal_record(id: String, deal: &Deal) -> TradeRecord {
    TradeRecord {
        id,
        symbol: deal.symbol.clone(),
        direction: direction_of(deal.is_buy),
        entry_price: deal.price,
        exit_price: Some(deal.price),
        quantity: deal.volume,
        timestamp: deal.time,
        status: TradeStatus::Closed,
        source: TradeSource::Mt5,
        ticket: Some(deal.ticket),
        current_price: None,
        profit: Some(deal.profit),
        commission: Some(deal.commission),
    }
}

fn direction_of(is_buy: bool) -> Direction {
    if is_buy {
        Direction::Buy
    } else {
        Direction::Sell
    }
}
