use cosmwasm_std::{OverflowError, StdError, Uint128};
use thiserror::Error;

use crate::state::LotteryState;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Invalid lottery state: {state:?}")]
    InvalidState { state: LotteryState },

    #[error("Lottery is not open")]
    LotteryNotOpen {},

    #[error("Ticket count must be at least 1")]
    InvalidTicketCount {},

    #[error("Not enough tickets sold: {sold} of {required}")]
    InsufficientParticipation { sold: u64, required: u64 },

    #[error("Incorrect payment, expected {expected_amount}{expected_denom}")]
    IncorrectPayment {
        expected_amount: Uint128,
        expected_denom: String,
    },

    #[error("Invalid parameter: {name}")]
    InvalidParameter { name: String },

    #[error("No result for round {round_id}")]
    NotFound { round_id: u64 },

    #[error("Payout of {required} cannot be covered, balance is {available}")]
    TransferFailure {
        required: Uint128,
        available: Uint128,
    },

    #[error("No ownership transfer pending")]
    NoPendingOwner {},

    #[error("This message does not accept funds")]
    NonPayable {},

    #[error("Cannot migrate from contract {contract} version {version}")]
    InvalidMigration { contract: String, version: String },
}
