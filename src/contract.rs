#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;
use cosmwasm_std::{
    ensure, to_binary, Addr, Binary, Deps, DepsMut, Env, MessageInfo, Order, Response, StdError,
    StdResult, Storage, Timestamp, Uint128, Uint64,
};
use cw2::{get_contract_version, set_contract_version};
use cw_asset::Asset;
use cw_storage_plus::Bound;
use semver::Version;

use crate::draw::{self, BlockEntropy, EntropySource};
use crate::error::ContractError;
use crate::msg::{
    ConfigResponse, ContractBalanceResponse, CurrentRoundResponse, ExecuteMsg, InstantiateMsg,
    LotteryActiveResponse, LotteryDurationResponse, LotteryStartTimeResponse,
    LotteryStateResponse, MigrateMsg, MinTicketsResponse, OwnerResponse, ParticipantsResponse,
    QueryMsg, RoundResponse, RoundResultsResponse, RoundWinnerResponse, TicketPriceResponse,
    TicketsPurchasedResponse, TimeRemainingResponse,
};
use crate::state::{
    Config, LotteryState, Round, RoundResult, CONFIG, MAIN_DENOM, PARTICIPANTS, PENDING_OWNER,
    RESULTS, ROUND, TICKETS,
};

// version info for migration
const CONTRACT_NAME: &str = "crates.io:timed_lottery";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

const MAX_FEE_PERCENTAGE: u8 = 100;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    ensure!(info.funds.is_empty(), ContractError::NonPayable {});
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let owner = match msg.owner {
        Some(addr) => deps.api.addr_validate(&addr)?,
        None => info.sender,
    };
    let fee_percentage = msg.fee_percentage.unwrap_or(0);

    ensure!(!msg.main_denom.is_empty(), invalid_parameter("main_denom"));
    ensure!(!msg.ticket_price.is_zero(), invalid_parameter("ticket_price"));
    ensure!(msg.min_tickets > 0, invalid_parameter("min_tickets"));
    ensure!(msg.lottery_duration > 0, invalid_parameter("lottery_duration"));
    ensure!(
        fee_percentage <= MAX_FEE_PERCENTAGE,
        invalid_parameter("fee_percentage")
    );

    let config = Config {
        owner: owner.clone(),
        ticket_price: msg.ticket_price,
        min_tickets: msg.min_tickets,
        lottery_duration: msg.lottery_duration,
        fee_percentage,
    };
    CONFIG.save(deps.storage, &config)?;
    MAIN_DENOM.save(deps.storage, &msg.main_denom)?;
    ROUND.save(
        deps.storage,
        &Round {
            id: 0,
            state: LotteryState::Closed,
            start_time: Timestamp::from_seconds(0),
            total_tickets: 0,
            participants: 0,
            pool: Uint128::zero(),
            entropy: Binary::default(),
        },
    )?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("owner", owner)
        .add_attribute("main_denom", msg.main_denom))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    // only ticket purchases take funds, anything else would be stranded in the contract
    if !matches!(msg, ExecuteMsg::BuyTickets { .. }) {
        ensure!(info.funds.is_empty(), ContractError::NonPayable {});
    }

    match msg {
        ExecuteMsg::BuyTickets { count } => execute_buy_tickets(deps, env, info, count),
        ExecuteMsg::StartLottery {} => execute_start_lottery(deps, env, info),
        ExecuteMsg::EndLottery {} => execute_end_lottery(deps, env, info, &BlockEntropy),
        ExecuteMsg::UpdateTicketPrice { new_ticket_price } => {
            execute_update_ticket_price(deps, info, new_ticket_price)
        }
        ExecuteMsg::UpdateMinTickets { new_min_tickets } => {
            execute_update_min_tickets(deps, info, new_min_tickets)
        }
        ExecuteMsg::UpdateLotteryDuration {
            new_lottery_duration,
        } => execute_update_lottery_duration(deps, info, new_lottery_duration),
        ExecuteMsg::UpdateFeePercentage { new_fee_percentage } => {
            execute_update_fee_percentage(deps, info, new_fee_percentage)
        }
        ExecuteMsg::TransferOwnership { new_owner } => {
            execute_transfer_ownership(deps, info, new_owner)
        }
        ExecuteMsg::CancelOwnershipTransfer {} => execute_cancel_ownership_transfer(deps, info),
        ExecuteMsg::AcceptOwnership {} => execute_accept_ownership(deps, info),
    }
}

pub fn execute_buy_tickets(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    count: u64,
) -> Result<Response, ContractError> {
    let mut round = ROUND.load(deps.storage)?;
    ensure!(
        round.state == LotteryState::Open,
        ContractError::LotteryNotOpen {}
    );
    ensure!(count > 0, ContractError::InvalidTicketCount {});

    // Payment must be exactly count * price in the main denom, nothing else attached
    let ticket_price = CONFIG.load(deps.storage)?.ticket_price;
    let main_denom = MAIN_DENOM.load(deps.storage)?;
    let expected_amount = ticket_price.checked_mul(Uint128::from(count))?;
    ensure!(
        info.funds.len() == 1
            && info.funds[0].denom == main_denom
            && info.funds[0].amount == expected_amount,
        ContractError::IncorrectPayment {
            expected_amount,
            expected_denom: main_denom,
        }
    );

    let buyer = info.sender;
    let held = TICKETS.may_load(deps.storage, (round.id, &buyer))?;
    let tickets = add_u64(held.unwrap_or_default(), count)?;
    let total_tickets = add_u64(round.total_tickets, count)?;
    let pool = round.pool.checked_add(expected_amount)?;

    if held.is_none() {
        let position = round.participants;
        round.participants = position
            .checked_add(1)
            .ok_or_else(|| StdError::generic_err("participant limit reached"))?;
        PARTICIPANTS.save(deps.storage, (round.id, position), &buyer)?;
    }
    TICKETS.save(deps.storage, (round.id, &buyer), &tickets)?;

    round.total_tickets = total_tickets;
    round.pool = pool;
    round.entropy = draw::mix_purchase(&round.entropy, &env, &buyer, count);
    ROUND.save(deps.storage, &round)?;

    Ok(Response::new()
        .add_attribute("method", "execute_buy_tickets")
        .add_attribute("round_id", round.id.to_string())
        .add_attribute("buyer", buyer)
        .add_attribute("tickets", count.to_string())
        .add_attribute("total_tickets", round.total_tickets.to_string())
        .add_attribute("pool", round.pool.to_string()))
}

pub fn execute_start_lottery(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = ensure_owner(deps.storage, &info.sender)?;
    let round = ROUND.load(deps.storage)?;
    ensure!(
        round.state == LotteryState::Closed,
        ContractError::InvalidState { state: round.state }
    );

    let id = add_u64(round.id, 1)?;
    let round = Round {
        id,
        state: LotteryState::Open,
        start_time: env.block.time,
        total_tickets: 0,
        participants: 0,
        pool: Uint128::zero(),
        entropy: draw::round_entropy(&env, id),
    };
    ROUND.save(deps.storage, &round)?;

    let start = env.block.time.seconds();
    Ok(Response::new()
        .add_attribute("method", "execute_start_lottery")
        .add_attribute("round_id", id.to_string())
        .add_attribute("start_time", start.to_string())
        .add_attribute(
            "end_time",
            start.saturating_add(config.lottery_duration).to_string(),
        ))
}

/// Closes the open round, draws a winner with `entropy` and pays out the pool.
///
/// Every check runs before the first write, and the payout is sent as a plain
/// bank message: if delivery fails the whole transaction is reverted and the
/// round stays open.
pub fn execute_end_lottery(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    entropy: &dyn EntropySource,
) -> Result<Response, ContractError> {
    let config = ensure_owner(deps.storage, &info.sender)?;
    let mut round = ROUND.load(deps.storage)?;
    ensure!(
        round.state == LotteryState::Open,
        ContractError::InvalidState { state: round.state }
    );
    ensure!(
        round.total_tickets >= config.min_tickets,
        ContractError::InsufficientParticipation {
            sold: round.total_tickets,
            required: config.min_tickets,
        }
    );

    let main_denom = MAIN_DENOM.load(deps.storage)?;
    let available = deps
        .querier
        .query_balance(&env.contract.address, &main_denom)?
        .amount;
    ensure!(
        available >= round.pool,
        ContractError::TransferFailure {
            required: round.pool,
            available,
        }
    );

    round.state = LotteryState::Drawing;
    let entries = load_entries(deps.storage, &round)?;
    let ticket_index = draw::ticket_index(&entropy.seed(&env, &round), round.total_tickets);
    let winner = draw::select_winner(&entries, ticket_index)
        .cloned()
        .ok_or_else(|| StdError::generic_err("ticket index out of range"))?;

    let fee_amount = round
        .pool
        .multiply_ratio(u128::from(config.fee_percentage), 100u128);
    let prize_amount = round.pool.checked_sub(fee_amount)?;

    let result = RoundResult {
        round_id: round.id,
        winner: winner.clone(),
        prize_amount,
        fee_amount,
        total_tickets: round.total_tickets,
        finalized_at: env.block.time,
    };
    RESULTS.save(deps.storage, round.id, &result)?;

    for (position, (participant, _)) in entries.iter().enumerate() {
        TICKETS.remove(deps.storage, (round.id, participant));
        PARTICIPANTS.remove(deps.storage, (round.id, position as u32));
    }

    let pre_pool = round.pool;
    round.state = LotteryState::Closed;
    round.total_tickets = 0;
    round.participants = 0;
    round.pool = Uint128::zero();
    ROUND.save(deps.storage, &round)?;

    let res = Response::new()
        .add_attribute("method", "execute_end_lottery")
        .add_attribute("round_id", round.id.to_string())
        .add_attribute("pool", pre_pool.to_string())
        .add_attribute("ticket_index", ticket_index.to_string())
        .add_attribute("winner", winner.clone());

    let mut attrs = vec![];
    let mut msgs = vec![];
    if !prize_amount.is_zero() {
        let asset = Asset::native(main_denom.clone(), prize_amount);
        attrs.push(("prize_amount", prize_amount.to_string()));
        msgs.push(asset.transfer_msg(winner)?);
    }
    if !fee_amount.is_zero() {
        let asset = Asset::native(main_denom, fee_amount);
        attrs.push(("fee_amount", fee_amount.to_string()));
        msgs.push(asset.transfer_msg(config.owner)?);
    }

    Ok(res.add_attributes(attrs).add_messages(msgs))
}

pub fn execute_update_ticket_price(
    deps: DepsMut,
    info: MessageInfo,
    new_ticket_price: Uint128,
) -> Result<Response, ContractError> {
    ensure_owner(deps.storage, &info.sender)?;
    ensure!(
        !new_ticket_price.is_zero(),
        invalid_parameter("ticket_price")
    );
    CONFIG.update(deps.storage, |mut state| -> Result<_, ContractError> {
        state.ticket_price = new_ticket_price;
        Ok(state)
    })?;
    Ok(Response::new()
        .add_attribute("method", "execute_update_ticket_price")
        .add_attribute("new_ticket_price", new_ticket_price.to_string()))
}

pub fn execute_update_min_tickets(
    deps: DepsMut,
    info: MessageInfo,
    new_min_tickets: u64,
) -> Result<Response, ContractError> {
    ensure_owner(deps.storage, &info.sender)?;
    ensure!(new_min_tickets > 0, invalid_parameter("min_tickets"));
    CONFIG.update(deps.storage, |mut state| -> Result<_, ContractError> {
        state.min_tickets = new_min_tickets;
        Ok(state)
    })?;
    Ok(Response::new()
        .add_attribute("method", "execute_update_min_tickets")
        .add_attribute("new_min_tickets", new_min_tickets.to_string()))
}

pub fn execute_update_lottery_duration(
    deps: DepsMut,
    info: MessageInfo,
    new_lottery_duration: u64,
) -> Result<Response, ContractError> {
    ensure_owner(deps.storage, &info.sender)?;
    ensure!(
        new_lottery_duration > 0,
        invalid_parameter("lottery_duration")
    );
    CONFIG.update(deps.storage, |mut state| -> Result<_, ContractError> {
        state.lottery_duration = new_lottery_duration;
        Ok(state)
    })?;
    Ok(Response::new()
        .add_attribute("method", "execute_update_lottery_duration")
        .add_attribute("new_lottery_duration", new_lottery_duration.to_string()))
}

pub fn execute_update_fee_percentage(
    deps: DepsMut,
    info: MessageInfo,
    new_fee_percentage: u8,
) -> Result<Response, ContractError> {
    ensure_owner(deps.storage, &info.sender)?;
    ensure!(
        new_fee_percentage <= MAX_FEE_PERCENTAGE,
        invalid_parameter("fee_percentage")
    );
    CONFIG.update(deps.storage, |mut state| -> Result<_, ContractError> {
        state.fee_percentage = new_fee_percentage;
        Ok(state)
    })?;
    Ok(Response::new()
        .add_attribute("method", "execute_update_fee_percentage")
        .add_attribute("new_fee_percentage", new_fee_percentage.to_string()))
}

pub fn execute_transfer_ownership(
    deps: DepsMut,
    info: MessageInfo,
    new_owner: String,
) -> Result<Response, ContractError> {
    ensure_owner(deps.storage, &info.sender)?;
    let pending_owner = deps.api.addr_validate(&new_owner)?;
    PENDING_OWNER.save(deps.storage, &pending_owner)?;
    Ok(Response::new()
        .add_attribute("method", "execute_transfer_ownership")
        .add_attribute("pending_owner", pending_owner))
}

pub fn execute_cancel_ownership_transfer(
    deps: DepsMut,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    ensure_owner(deps.storage, &info.sender)?;
    let pending_owner = PENDING_OWNER
        .may_load(deps.storage)?
        .ok_or(ContractError::NoPendingOwner {})?;
    PENDING_OWNER.remove(deps.storage);
    Ok(Response::new()
        .add_attribute("method", "execute_cancel_ownership_transfer")
        .add_attribute("cancelled_owner", pending_owner))
}

pub fn execute_accept_ownership(
    deps: DepsMut,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let pending_owner = PENDING_OWNER
        .may_load(deps.storage)?
        .ok_or(ContractError::NoPendingOwner {})?;
    ensure!(info.sender == pending_owner, ContractError::Unauthorized {});

    CONFIG.update(deps.storage, |mut state| -> Result<_, ContractError> {
        state.owner = pending_owner.clone();
        Ok(state)
    })?;
    PENDING_OWNER.remove(deps.storage);
    Ok(Response::new()
        .add_attribute("method", "execute_accept_ownership")
        .add_attribute("owner", pending_owner))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    let stored = get_contract_version(deps.storage)?;
    let stored_version = parse_version(&stored.version)?;
    let new_version = parse_version(CONTRACT_VERSION)?;
    // same contract only, and never to an older version
    ensure!(
        stored.contract == CONTRACT_NAME && stored_version <= new_version,
        ContractError::InvalidMigration {
            contract: stored.contract,
            version: stored.version,
        }
    );
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::new()
        .add_attribute("method", "migrate")
        .add_attribute("from_version", stored.version)
        .add_attribute("to_version", CONTRACT_VERSION))
}

fn parse_version(version: &str) -> StdResult<Version> {
    version.parse().map_err(|err: semver::Error| {
        StdError::generic_err(format!("Invalid version {}: {}", version, err))
    })
}

fn ensure_owner(storage: &dyn Storage, sender: &Addr) -> Result<Config, ContractError> {
    let config = CONFIG.load(storage)?;
    ensure!(*sender == config.owner, ContractError::Unauthorized {});
    Ok(config)
}

fn invalid_parameter(name: &str) -> ContractError {
    ContractError::InvalidParameter {
        name: name.to_string(),
    }
}

fn add_u64(left: u64, right: u64) -> Result<u64, ContractError> {
    Ok(Uint64::new(left).checked_add(Uint64::new(right))?.u64())
}

// Participants with their ticket counts, in order of first purchase
fn load_entries(storage: &dyn Storage, round: &Round) -> StdResult<Vec<(Addr, u64)>> {
    (0..round.participants)
        .map(|position| {
            let participant = PARTICIPANTS.load(storage, (round.id, position))?;
            let tickets = TICKETS.load(storage, (round.id, &participant))?;
            Ok((participant, tickets))
        })
        .collect()
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> Result<Binary, ContractError> {
    let res = match msg {
        QueryMsg::QueryOwner {} => to_binary(&query_owner(deps)?),
        QueryMsg::QueryConfig {} => to_binary(&query_config(deps)?),
        QueryMsg::QueryTicketPrice {} => to_binary(&TicketPriceResponse {
            ticket_price: CONFIG.load(deps.storage)?.ticket_price,
        }),
        QueryMsg::QueryMinTickets {} => to_binary(&MinTicketsResponse {
            min_tickets: CONFIG.load(deps.storage)?.min_tickets,
        }),
        QueryMsg::QueryLotteryDuration {} => to_binary(&LotteryDurationResponse {
            lottery_duration: CONFIG.load(deps.storage)?.lottery_duration,
        }),
        QueryMsg::QueryCurrentRound {} => to_binary(&CurrentRoundResponse {
            round_id: ROUND.load(deps.storage)?.id,
        }),
        QueryMsg::QueryLotteryState {} => to_binary(&LotteryStateResponse {
            state: ROUND.load(deps.storage)?.state,
        }),
        QueryMsg::QueryLotteryStartTime {} => to_binary(&LotteryStartTimeResponse {
            start_time: ROUND.load(deps.storage)?.start_time.seconds(),
        }),
        QueryMsg::QueryRound {} => to_binary(&query_round(deps)?),
        QueryMsg::QueryTicketsPurchased { address } => {
            to_binary(&query_tickets_purchased(deps, address)?)
        }
        QueryMsg::QueryNumberOfParticipants {} => to_binary(&ParticipantsResponse {
            participants: ROUND.load(deps.storage)?.participants,
        }),
        QueryMsg::QueryIsLotteryActive {} => to_binary(&query_is_lottery_active(deps, env)?),
        QueryMsg::QueryTimeRemaining {} => to_binary(&query_time_remaining(deps, env)?),
        QueryMsg::QueryRoundWinner { round_id } => {
            to_binary(&query_round_winner(deps, round_id)?)
        }
        QueryMsg::QueryRoundResult { round_id } => {
            to_binary(&query_round_result(deps, round_id)?)
        }
        QueryMsg::QueryRoundResults { start_after, limit } => {
            to_binary(&query_round_results(deps, start_after, limit)?)
        }
        QueryMsg::QueryBalance {} => to_binary(&query_balance(deps, env)?),
    };
    Ok(res?)
}

fn query_owner(deps: Deps) -> StdResult<OwnerResponse> {
    let config = CONFIG.load(deps.storage)?;
    let pending_owner = PENDING_OWNER.may_load(deps.storage)?;
    Ok(OwnerResponse {
        owner: config.owner.to_string(),
        pending_owner: pending_owner.map(|addr| addr.to_string()),
    })
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        owner: config.owner.to_string(),
        main_denom: MAIN_DENOM.load(deps.storage)?,
        ticket_price: config.ticket_price,
        min_tickets: config.min_tickets,
        lottery_duration: config.lottery_duration,
        fee_percentage: config.fee_percentage,
    })
}

fn query_round(deps: Deps) -> StdResult<RoundResponse> {
    let config = CONFIG.load(deps.storage)?;
    let round = ROUND.load(deps.storage)?;
    Ok(RoundResponse {
        round_id: round.id,
        state: round.state,
        start_time: round.start_time,
        lottery_duration: config.lottery_duration,
        total_tickets: round.total_tickets,
        participants: round.participants,
        pool: round.pool,
    })
}

fn query_tickets_purchased(deps: Deps, address: String) -> StdResult<TicketsPurchasedResponse> {
    let address = deps.api.addr_validate(&address)?;
    let round = ROUND.load(deps.storage)?;
    let tickets = TICKETS
        .may_load(deps.storage, (round.id, &address))?
        .unwrap_or_default();
    Ok(TicketsPurchasedResponse { tickets })
}

// Deadline of the open round in seconds, None when no round is open
fn round_deadline(deps: Deps) -> StdResult<Option<u64>> {
    let round = ROUND.load(deps.storage)?;
    if round.state != LotteryState::Open {
        return Ok(None);
    }
    let lottery_duration = CONFIG.load(deps.storage)?.lottery_duration;
    Ok(Some(
        round.start_time.seconds().saturating_add(lottery_duration),
    ))
}

fn query_is_lottery_active(deps: Deps, env: Env) -> StdResult<LotteryActiveResponse> {
    let now = env.block.time.seconds();
    let active = round_deadline(deps)?.map_or(false, |deadline| now < deadline);
    Ok(LotteryActiveResponse { active })
}

fn query_time_remaining(deps: Deps, env: Env) -> StdResult<TimeRemainingResponse> {
    let now = env.block.time.seconds();
    let seconds = round_deadline(deps)?.map_or(0, |deadline| deadline.saturating_sub(now));
    Ok(TimeRemainingResponse { seconds })
}

fn query_round_winner(deps: Deps, round_id: u64) -> StdResult<RoundWinnerResponse> {
    let res = match RESULTS.may_load(deps.storage, round_id)? {
        Some(result) => RoundWinnerResponse {
            winner: Some(result.winner),
            prize_amount: result.prize_amount,
        },
        None => RoundWinnerResponse {
            winner: None,
            prize_amount: Uint128::zero(),
        },
    };
    Ok(res)
}

fn query_round_result(deps: Deps, round_id: u64) -> Result<RoundResult, ContractError> {
    RESULTS
        .may_load(deps.storage, round_id)?
        .ok_or(ContractError::NotFound { round_id })
}

// Limits for pagination
const MAX_LIMIT: u32 = 30;
const DEFAULT_LIMIT: u32 = 10;

fn query_round_results(
    deps: Deps,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<RoundResultsResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let start = start_after.map(Bound::exclusive);
    let results: StdResult<Vec<_>> = RESULTS
        .range(deps.storage, start, None, Order::Ascending)
        .take(limit)
        .map(|item| item.map(|(_, result)| result))
        .collect();

    Ok(RoundResultsResponse { results: results? })
}

fn query_balance(deps: Deps, env: Env) -> StdResult<ContractBalanceResponse> {
    let main_denom = MAIN_DENOM.load(deps.storage)?;
    let balance = deps
        .querier
        .query_balance(&env.contract.address, &main_denom)?;
    Ok(ContractBalanceResponse {
        amount: balance.amount,
    })
}
