use crate::state::{LotteryState, RoundResult};
use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Timestamp, Uint128};

#[cw_serde]
pub struct InstantiateMsg {
    pub owner: Option<String>,
    // main denom, depends on the chain: "uosmo", "untrn", "usei", ...
    pub main_denom: String,
    pub ticket_price: Uint128,
    pub min_tickets: u64,
    pub lottery_duration: u64,
    pub fee_percentage: Option<u8>,
}

#[cw_serde]
pub enum ExecuteMsg {
    BuyTickets { count: u64 },
    StartLottery {},
    EndLottery {},
    UpdateTicketPrice { new_ticket_price: Uint128 },
    UpdateMinTickets { new_min_tickets: u64 },
    UpdateLotteryDuration { new_lottery_duration: u64 },
    UpdateFeePercentage { new_fee_percentage: u8 },
    /// Nominates `new_owner`; it becomes owner once it sends `AcceptOwnership`.
    /// A later nomination replaces the pending one.
    TransferOwnership { new_owner: String },
    /// Withdraws the pending nomination.
    CancelOwnershipTransfer {},
    AcceptOwnership {},
}

#[cw_serde]
pub struct MigrateMsg {}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(OwnerResponse)]
    QueryOwner {},
    #[returns(ConfigResponse)]
    QueryConfig {},
    #[returns(TicketPriceResponse)]
    QueryTicketPrice {},
    #[returns(MinTicketsResponse)]
    QueryMinTickets {},
    #[returns(LotteryDurationResponse)]
    QueryLotteryDuration {},
    #[returns(CurrentRoundResponse)]
    QueryCurrentRound {},
    #[returns(LotteryStateResponse)]
    QueryLotteryState {},
    #[returns(LotteryStartTimeResponse)]
    QueryLotteryStartTime {},
    #[returns(RoundResponse)]
    QueryRound {},
    #[returns(TicketsPurchasedResponse)]
    QueryTicketsPurchased { address: String },
    #[returns(ParticipantsResponse)]
    QueryNumberOfParticipants {},
    #[returns(LotteryActiveResponse)]
    QueryIsLotteryActive {},
    #[returns(TimeRemainingResponse)]
    QueryTimeRemaining {},
    #[returns(RoundWinnerResponse)]
    QueryRoundWinner { round_id: u64 },
    #[returns(RoundResult)]
    QueryRoundResult { round_id: u64 },
    #[returns(RoundResultsResponse)]
    QueryRoundResults {
        start_after: Option<u64>,
        limit: Option<u32>,
    },
    #[returns(ContractBalanceResponse)]
    QueryBalance {},
}

#[cw_serde]
pub struct OwnerResponse {
    pub owner: String,
    pub pending_owner: Option<String>,
}

#[cw_serde]
pub struct ConfigResponse {
    pub owner: String,
    pub main_denom: String,
    pub ticket_price: Uint128,
    pub min_tickets: u64,
    pub lottery_duration: u64,
    pub fee_percentage: u8,
}

#[cw_serde]
pub struct TicketPriceResponse {
    pub ticket_price: Uint128,
}

#[cw_serde]
pub struct MinTicketsResponse {
    pub min_tickets: u64,
}

#[cw_serde]
pub struct LotteryDurationResponse {
    pub lottery_duration: u64,
}

#[cw_serde]
pub struct CurrentRoundResponse {
    pub round_id: u64,
}

#[cw_serde]
pub struct LotteryStateResponse {
    pub state: LotteryState,
}

#[cw_serde]
pub struct LotteryStartTimeResponse {
    pub start_time: u64,
}

#[cw_serde]
pub struct RoundResponse {
    pub round_id: u64,
    pub state: LotteryState,
    pub start_time: Timestamp,
    pub lottery_duration: u64,
    pub total_tickets: u64,
    pub participants: u32,
    pub pool: Uint128,
}

#[cw_serde]
pub struct TicketsPurchasedResponse {
    pub tickets: u64,
}

#[cw_serde]
pub struct ParticipantsResponse {
    pub participants: u32,
}

#[cw_serde]
pub struct LotteryActiveResponse {
    pub active: bool,
}

#[cw_serde]
pub struct TimeRemainingResponse {
    pub seconds: u64,
}

/// `winner` is `None` and `prize_amount` zero for rounds without a result.
#[cw_serde]
pub struct RoundWinnerResponse {
    pub winner: Option<Addr>,
    pub prize_amount: Uint128,
}

#[cw_serde]
pub struct RoundResultsResponse {
    pub results: Vec<RoundResult>,
}

#[cw_serde]
pub struct ContractBalanceResponse {
    pub amount: Uint128,
}
