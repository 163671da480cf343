use cosmwasm_std::{coins, Addr, BankMsg, Empty, Uint128};
use cw_multi_test::{App, Contract, ContractWrapper, Executor};

use crate::contract::{execute, instantiate, query};
use crate::error::ContractError;
use crate::msg::{
    ExecuteMsg, InstantiateMsg, LotteryStateResponse, QueryMsg, RoundWinnerResponse,
    TicketsPurchasedResponse,
};
use crate::state::{LotteryState, RoundResult};

const OWNER: &str = "owner";
const ALICE: &str = "alice";
const BOB: &str = "bob";
const DENOM: &str = "usei";
const PRICE: u128 = 10;
const DURATION: u64 = 86400;
const INITIAL_BALANCE: u128 = 1_000;

fn lottery_contract() -> Box<dyn Contract<Empty>> {
    Box::new(ContractWrapper::new(execute, instantiate, query))
}

fn mock_app() -> App {
    App::new(|router, _, storage| {
        for player in [ALICE, BOB] {
            router
                .bank
                .init_balance(
                    storage,
                    &Addr::unchecked(player),
                    coins(INITIAL_BALANCE, DENOM),
                )
                .unwrap();
        }
    })
}

fn setup(app: &mut App, fee_percentage: Option<u8>) -> Addr {
    let code_id = app.store_code(lottery_contract());
    let msg = InstantiateMsg {
        owner: None,
        main_denom: DENOM.to_string(),
        ticket_price: Uint128::new(PRICE),
        min_tickets: 3,
        lottery_duration: DURATION,
        fee_percentage,
    };
    app.instantiate_contract(code_id, Addr::unchecked(OWNER), &msg, &[], "lottery", None)
        .unwrap()
}

// Contract errors are compared by message so the assertions do not depend on how
// the app wraps them
fn owner_execute(app: &mut App, lottery: &Addr, msg: ExecuteMsg) -> Result<(), String> {
    app.execute_contract(Addr::unchecked(OWNER), lottery.clone(), &msg, &[])
        .map(|_| ())
        .map_err(|err| err.root_cause().to_string())
}

fn buy(app: &mut App, lottery: &Addr, buyer: &str, count: u64) {
    app.execute_contract(
        Addr::unchecked(buyer),
        lottery.clone(),
        &ExecuteMsg::BuyTickets { count },
        &coins(PRICE * count as u128, DENOM),
    )
    .unwrap();
}

fn balance(app: &App, address: &str) -> u128 {
    app.wrap().query_balance(address, DENOM).unwrap().amount.u128()
}

fn lottery_state(app: &App, lottery: &Addr) -> LotteryState {
    let res: LotteryStateResponse = app
        .wrap()
        .query_wasm_smart(lottery.clone(), &QueryMsg::QueryLotteryState {})
        .unwrap();
    res.state
}

fn round_winner(app: &App, lottery: &Addr, round_id: u64) -> RoundWinnerResponse {
    app.wrap()
        .query_wasm_smart(lottery.clone(), &QueryMsg::QueryRoundWinner { round_id })
        .unwrap()
}

#[test]
fn test_full_round_pays_winner() {
    let mut app = mock_app();
    let lottery = setup(&mut app, None);

    owner_execute(&mut app, &lottery, ExecuteMsg::StartLottery {}).unwrap();
    buy(&mut app, &lottery, ALICE, 2);
    buy(&mut app, &lottery, BOB, 1);
    assert_eq!(balance(&app, lottery.as_str()), 30);

    app.update_block(|block| {
        block.time = block.time.plus_seconds(DURATION);
        block.height += 1;
    });
    owner_execute(&mut app, &lottery, ExecuteMsg::EndLottery {}).unwrap();

    let winner = round_winner(&app, &lottery, 1);
    assert_eq!(winner.prize_amount, Uint128::new(30));
    let winner = winner.winner.unwrap();
    let (paid_by_winner, loser, paid_by_loser) = if winner.as_str() == ALICE {
        (20, BOB, 10)
    } else {
        assert_eq!(winner.as_str(), BOB);
        (10, ALICE, 20)
    };
    assert_eq!(
        balance(&app, winner.as_str()),
        INITIAL_BALANCE - paid_by_winner + 30
    );
    assert_eq!(balance(&app, loser), INITIAL_BALANCE - paid_by_loser);
    assert_eq!(balance(&app, lottery.as_str()), 0);
    assert_eq!(lottery_state(&app, &lottery), LotteryState::Closed);

    let result: RoundResult = app
        .wrap()
        .query_wasm_smart(lottery.clone(), &QueryMsg::QueryRoundResult { round_id: 1 })
        .unwrap();
    assert_eq!(result.total_tickets, 3);
    assert_eq!(result.winner, winner);
}

#[test]
fn test_incorrect_payment_is_not_kept() {
    let mut app = mock_app();
    let lottery = setup(&mut app, None);
    owner_execute(&mut app, &lottery, ExecuteMsg::StartLottery {}).unwrap();

    let err = app
        .execute_contract(
            Addr::unchecked(ALICE),
            lottery.clone(),
            &ExecuteMsg::BuyTickets { count: 2 },
            &coins(30, DENOM),
        )
        .unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        ContractError::IncorrectPayment {
            expected_amount: Uint128::new(20),
            expected_denom: DENOM.to_string(),
        }
        .to_string()
    );

    assert_eq!(balance(&app, ALICE), INITIAL_BALANCE);
    assert_eq!(balance(&app, lottery.as_str()), 0);
    let res: TicketsPurchasedResponse = app
        .wrap()
        .query_wasm_smart(
            lottery.clone(),
            &QueryMsg::QueryTicketsPurchased {
                address: ALICE.to_string(),
            },
        )
        .unwrap();
    assert_eq!(res.tickets, 0);
}

#[test]
fn test_missing_custody_keeps_round_open() {
    let mut app = mock_app();
    let lottery = setup(&mut app, None);
    owner_execute(&mut app, &lottery, ExecuteMsg::StartLottery {}).unwrap();
    buy(&mut app, &lottery, ALICE, 2);
    buy(&mut app, &lottery, BOB, 1);

    // move the pool out of the contract behind its back
    app.execute(
        lottery.clone(),
        BankMsg::Send {
            to_address: "vault".to_string(),
            amount: coins(30, DENOM),
        }
        .into(),
    )
    .unwrap();

    let err = owner_execute(&mut app, &lottery, ExecuteMsg::EndLottery {}).unwrap_err();
    assert_eq!(
        err,
        ContractError::TransferFailure {
            required: Uint128::new(30),
            available: Uint128::zero(),
        }
        .to_string()
    );
    assert_eq!(lottery_state(&app, &lottery), LotteryState::Open);
    assert_eq!(round_winner(&app, &lottery, 1).winner, None);

    // once the funds are back the same round can be finalized
    app.execute(
        Addr::unchecked("vault"),
        BankMsg::Send {
            to_address: lottery.to_string(),
            amount: coins(30, DENOM),
        }
        .into(),
    )
    .unwrap();
    owner_execute(&mut app, &lottery, ExecuteMsg::EndLottery {}).unwrap();
    assert_eq!(lottery_state(&app, &lottery), LotteryState::Closed);
    assert_eq!(balance(&app, lottery.as_str()), 0);
    assert!(round_winner(&app, &lottery, 1).winner.is_some());
}

#[test]
fn test_fee_is_paid_to_owner() {
    let mut app = mock_app();
    let lottery = setup(&mut app, Some(10));
    owner_execute(&mut app, &lottery, ExecuteMsg::StartLottery {}).unwrap();
    buy(&mut app, &lottery, ALICE, 3);
    buy(&mut app, &lottery, BOB, 2);

    owner_execute(&mut app, &lottery, ExecuteMsg::EndLottery {}).unwrap();

    assert_eq!(balance(&app, OWNER), 5);
    let winner = round_winner(&app, &lottery, 1);
    assert_eq!(winner.prize_amount, Uint128::new(45));
    let winner = winner.winner.unwrap();
    let paid = if winner.as_str() == ALICE { 30 } else { 20 };
    assert_eq!(balance(&app, winner.as_str()), INITIAL_BALANCE - paid + 45);
    assert_eq!(balance(&app, lottery.as_str()), 0);
}

#[test]
fn test_players_cannot_drive_the_round() {
    let mut app = mock_app();
    let lottery = setup(&mut app, None);

    let err = app
        .execute_contract(
            Addr::unchecked(ALICE),
            lottery.clone(),
            &ExecuteMsg::StartLottery {},
            &[],
        )
        .unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        ContractError::Unauthorized {}.to_string()
    );
    assert_eq!(lottery_state(&app, &lottery), LotteryState::Closed);
}

#[test]
fn test_funds_on_owner_messages_are_refused() {
    let mut app = mock_app();
    let lottery = setup(&mut app, None);
    app.init_modules(|router, _, storage| {
        router
            .bank
            .init_balance(storage, &Addr::unchecked(OWNER), coins(100, DENOM))
            .unwrap();
    });

    for msg in [ExecuteMsg::StartLottery {}, ExecuteMsg::EndLottery {}] {
        let err = app
            .execute_contract(
                Addr::unchecked(OWNER),
                lottery.clone(),
                &msg,
                &coins(50, DENOM),
            )
            .unwrap_err();
        assert_eq!(
            err.root_cause().to_string(),
            ContractError::NonPayable {}.to_string()
        );
        assert_eq!(balance(&app, OWNER), 100);
        assert_eq!(balance(&app, lottery.as_str()), 0);
    }
    assert_eq!(lottery_state(&app, &lottery), LotteryState::Closed);

    // a full round afterwards leaves nothing behind in the contract
    owner_execute(&mut app, &lottery, ExecuteMsg::StartLottery {}).unwrap();
    buy(&mut app, &lottery, ALICE, 2);
    buy(&mut app, &lottery, BOB, 1);
    owner_execute(&mut app, &lottery, ExecuteMsg::EndLottery {}).unwrap();
    assert_eq!(balance(&app, lottery.as_str()), 0);
    assert_eq!(balance(&app, OWNER), 100);
}
