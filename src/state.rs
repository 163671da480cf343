use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary, Timestamp, Uint128};
use cw_storage_plus::{Item, Map};

#[cw_serde]
pub struct Config {
    pub owner: Addr,
    pub ticket_price: Uint128,
    pub min_tickets: u64,
    /// Advisory round length in seconds.
    pub lottery_duration: u64,
    /// Share of the pool paid to the owner at finalization.
    pub fee_percentage: u8,
}

#[cw_serde]
pub enum LotteryState {
    Open,
    Closed,
    Drawing,
}

/// The active (or last finalized) round.
#[cw_serde]
pub struct Round {
    pub id: u64,
    pub state: LotteryState,
    pub start_time: Timestamp,
    pub total_tickets: u64,
    /// Number of distinct buyers, also the length of the participant order.
    pub participants: u32,
    pub pool: Uint128,
    /// Running hash folded over every purchase of the round.
    pub entropy: Binary,
}

#[cw_serde]
pub struct RoundResult {
    pub round_id: u64,
    pub winner: Addr,
    pub prize_amount: Uint128,
    pub fee_amount: Uint128,
    pub total_tickets: u64,
    pub finalized_at: Timestamp,
}

pub const CONFIG: Item<Config> = Item::new("config");
pub const MAIN_DENOM: Item<String> = Item::new("main_denom");
pub const PENDING_OWNER: Item<Addr> = Item::new("pending_owner");
pub const ROUND: Item<Round> = Item::new("round");

// (round id, buyer) -> tickets held
pub const TICKETS: Map<(u64, &Addr), u64> = Map::new("tickets");
// (round id, position) -> buyer, in order of first purchase
pub const PARTICIPANTS: Map<(u64, u32), Addr> = Map::new("participants");
pub const RESULTS: Map<u64, RoundResult> = Map::new("results");
