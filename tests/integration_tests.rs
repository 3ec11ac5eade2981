//! Integration tests for the fyDai ledger.
//!
//! These tests drive the public API through complete borrowing lifecycles.

use fydai::prelude::*;
use fydai::utils::constants::{RAY, SUPPLY_LIMIT};
use fydai::utils::math::{mul_div_ceil, ratio_mul_ceil};
use proptest::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════════
// TEST HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

const NOW: u64 = 1_600_000_000;
const MATURITY: u64 = NOW + 30 * 86_400;
const LATER: u64 = NOW + 90 * 86_400;
const FUNDS: u128 = 1_000_000_000_000;

fn alice() -> Address {
    Address::derive("alice")
}

fn bob() -> Address {
    Address::derive("bob")
}

fn ray(numerator: u128, denominator: u128) -> Ray {
    Ray::from_ratio(numerator, denominator).unwrap()
}

struct World {
    ledger: PositionLedger,
    indices: ManualIndexSource,
    oracle: StaticPriceOracle,
    custody: InMemoryCustody,
}

impl World {
    fn new() -> Self {
        let mut ledger = PositionLedger::new(LedgerParams::default()).unwrap();
        ledger.create_series(MATURITY, NOW).unwrap();
        ledger.create_series(LATER, NOW).unwrap();

        let oracle = StaticPriceOracle::new()
            .with_price(CollateralId::weth(), Ray::from_integer(200).unwrap())
            .with_price(CollateralId::chai(), Ray::ONE);

        let mut custody = InMemoryCustody::new();
        for user in [alice(), bob()] {
            for asset in [
                Asset::Base,
                Asset::Collateral(CollateralId::weth()),
                Asset::Collateral(CollateralId::chai()),
            ] {
                custody.mint(asset.clone(), user, FUNDS).unwrap();
                custody.approve(asset, user, u128::MAX);
            }
        }
        custody.fund_reserve(Asset::Base, FUNDS).unwrap();

        Self {
            ledger,
            indices: ManualIndexSource::default(),
            oracle,
            custody,
        }
    }

    fn post(&mut self, collateral: &CollateralId, user: Address, amount: u128) -> Result<()> {
        let mut ctx = LedgerContext::new(&self.indices, &self.oracle, &mut self.custody);
        self.ledger.post(collateral, user, user, amount, &mut ctx)
    }

    fn withdraw(&mut self, collateral: &CollateralId, user: Address, amount: u128) -> Result<()> {
        let mut ctx = LedgerContext::new(&self.indices, &self.oracle, &mut self.custody);
        self.ledger.withdraw(collateral, user, user, amount, &mut ctx)
    }

    fn borrow(&mut self, collateral: &CollateralId, maturity: u64, user: Address, amount: u128) -> Result<()> {
        let mut ctx = LedgerContext::new(&self.indices, &self.oracle, &mut self.custody);
        self.ledger.borrow(collateral, maturity, user, user, amount, &mut ctx)
    }

    fn repay_dai(&mut self, collateral: &CollateralId, maturity: u64, user: Address, amount: u128) -> Result<u128> {
        let mut ctx = LedgerContext::new(&self.indices, &self.oracle, &mut self.custody);
        self.ledger.repay_dai(collateral, maturity, user, user, amount, &mut ctx)
    }

    fn redeem(&mut self, maturity: u64, user: Address, amount: u128) -> Result<u128> {
        self.ledger
            .series_mut(maturity)
            .unwrap()
            .redeem(user, user, user, amount, &self.indices, &mut self.custody)
    }

    fn base_of(&self, user: &Address) -> u128 {
        self.custody.balance_of(&Asset::Base, user)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIFECYCLE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_borrow_lifecycle() {
    let mut world = World::new();
    let weth = CollateralId::weth();

    // 1 WETH at 200 with a 150% ratio borrows 133 face units
    world.post(&weth, alice(), 1).unwrap();
    assert_eq!(world.ledger.power_of(&weth, &alice(), &world.oracle).unwrap(), 133);
    world.borrow(&weth, MATURITY, alice(), 133).unwrap();

    world.ledger.mature_all(MATURITY, &world.indices).unwrap();
    world.indices.set_savings(ray(11, 10));
    world.indices.set_borrow(ray(12, 10));

    // The borrower sells the fyDai; the buyer redeems after maturity
    world
        .ledger
        .series_mut(MATURITY)
        .unwrap()
        .transfer(alice(), bob(), 133)
        .unwrap();
    let before = world.base_of(&bob());
    let paid = world.redeem(MATURITY, bob(), 133).unwrap();
    assert_eq!(paid, 146); // floor(133 * 1.1)
    assert_eq!(world.base_of(&bob()), before + 146);

    // Debt grew with the borrow-cost index and is repaid in base asset
    let debt = world.ledger.debt_dai(&weth, MATURITY, &alice(), &world.indices).unwrap();
    assert_eq!(debt, 160); // ceil(133 * 1.2)
    assert!(matches!(world.withdraw(&weth, alice(), 1), Err(Error::InsufficientCollateral { .. })));
    assert_eq!(world.repay_dai(&weth, MATURITY, alice(), debt).unwrap(), debt);

    world.withdraw(&weth, alice(), 1).unwrap();
    assert_eq!(world.ledger.position(&weth, MATURITY, &alice()), Position::default());
    assert_eq!(world.ledger.series(MATURITY).unwrap().total_supply(), 0);
    assert!(world.ledger.series(MATURITY).unwrap().verify_supply_invariant());
}

#[test]
fn test_redeem_before_and_at_maturity() {
    let mut world = World::new();
    let chai = CollateralId::chai();
    world.post(&chai, alice(), 500).unwrap();
    world.borrow(&chai, MATURITY, alice(), 100).unwrap();

    assert_eq!(world.redeem(MATURITY, alice(), 100), Err(Error::NotMature));

    world.indices.set_savings(ray(6, 5));
    world.indices.set_borrow(ray(7, 5));
    assert!(matches!(
        world.ledger.series_mut(MATURITY).unwrap().mature(MATURITY - 1, &world.indices),
        Err(Error::TooEarly { .. })
    ));
    world
        .ledger
        .series_mut(MATURITY)
        .unwrap()
        .mature(MATURITY, &world.indices)
        .unwrap();

    let series = world.ledger.series(MATURITY).unwrap();
    assert!(series.is_mature());
    assert_eq!(series.chi0(), Some(ray(6, 5)));
    assert_eq!(series.rate0(), Some(ray(7, 5)));
    assert!(!world.ledger.series(LATER).unwrap().is_mature());

    assert_eq!(world.redeem(MATURITY, alice(), 100).unwrap(), 100);
}

#[test]
fn test_redeem_with_savings_growth() {
    let mut world = World::new();
    let chai = CollateralId::chai();
    world.post(&chai, alice(), 10_000).unwrap();
    world.borrow(&chai, MATURITY, alice(), 4_321).unwrap();
    world.ledger.mature_all(MATURITY, &world.indices).unwrap();

    world.indices.set_savings(ray(3, 2));
    world.indices.set_borrow(ray(8, 5));

    let before = world.base_of(&alice());
    let paid = world.redeem(MATURITY, alice(), 4_321).unwrap();
    assert_eq!(paid, 4_321 * 3 / 2);
    assert_eq!(world.base_of(&alice()), before + paid);
}

#[test]
fn test_debt_repaid_at_present_value() {
    let mut world = World::new();
    let chai = CollateralId::chai();
    world.post(&chai, alice(), 10_000).unwrap();
    world.borrow(&chai, MATURITY, alice(), 1_000).unwrap();

    world.indices.set_borrow(Ray::from_integer(3).unwrap());
    world.ledger.mature_all(MATURITY, &world.indices).unwrap();
    world.indices.set_borrow(Ray::from_integer(4).unwrap());

    let growth = world
        .ledger
        .series(MATURITY)
        .unwrap()
        .borrow_cost_growth(&world.indices)
        .unwrap();
    let debt = world.ledger.debt_dai(&chai, MATURITY, &alice(), &world.indices).unwrap();
    assert_eq!(debt, ratio_mul_ceil(1_000, growth).unwrap());
    assert_eq!(debt, 1_334);

    let before = world.base_of(&alice());
    assert_eq!(world.repay_dai(&chai, MATURITY, alice(), debt).unwrap(), debt);
    assert_eq!(world.ledger.debt_dai(&chai, MATURITY, &alice(), &world.indices).unwrap(), 0);
    assert_eq!(world.base_of(&alice()), before - debt);
}

#[test]
fn test_borrow_exactly_power() {
    let mut world = World::new();
    let chai = CollateralId::chai();
    world.post(&chai, alice(), 777).unwrap();
    let power = world.ledger.power_of(&chai, &alice(), &world.oracle).unwrap();
    assert_eq!(power, 777);

    assert_eq!(
        world.borrow(&chai, MATURITY, alice(), power + 1),
        Err(Error::DebtLimitExceeded { debt: power + 1, power })
    );
    world.borrow(&chai, MATURITY, alice(), power).unwrap();
    assert!(matches!(
        world.borrow(&chai, LATER, alice(), 1),
        Err(Error::DebtLimitExceeded { .. })
    ));
}

#[test]
fn test_repay_overpayment_refunds_excess() {
    let mut world = World::new();
    let chai = CollateralId::chai();
    world.post(&chai, alice(), 1_000).unwrap();
    world.borrow(&chai, MATURITY, alice(), 100).unwrap();
    world.borrow(&chai, LATER, alice(), 100).unwrap();

    // fyDai overpayment, topped up with bob's borrowed fyDai
    world.post(&chai, bob(), 100).unwrap();
    world.borrow(&chai, MATURITY, bob(), 50).unwrap();
    world
        .ledger
        .series_mut(MATURITY)
        .unwrap()
        .transfer(bob(), alice(), 50)
        .unwrap();
    assert_eq!(
        world.ledger.repay_fy_dai(&chai, MATURITY, alice(), alice(), 150).unwrap(),
        100
    );
    assert_eq!(world.ledger.debt_fy_dai(&chai, MATURITY, &alice()), 0);
    assert_eq!(world.ledger.series(MATURITY).unwrap().balance_of(&alice()), 50);

    // base overpayment
    let before = world.base_of(&alice());
    assert_eq!(world.repay_dai(&chai, LATER, alice(), 1_000).unwrap(), 100);
    assert_eq!(world.ledger.debt_fy_dai(&chai, LATER, &alice()), 0);
    assert_eq!(world.base_of(&alice()), before - 100);
}

#[test]
fn test_positions_are_per_collateral() {
    let mut world = World::new();
    let weth = CollateralId::weth();
    let chai = CollateralId::chai();
    world.post(&weth, alice(), 3).unwrap();
    world.post(&chai, alice(), 100).unwrap();
    world.borrow(&weth, MATURITY, alice(), 400).unwrap();
    world.borrow(&chai, MATURITY, alice(), 100).unwrap();

    assert_eq!(world.ledger.debt_fy_dai(&weth, MATURITY, &alice()), 400);
    assert_eq!(world.ledger.debt_fy_dai(&chai, MATURITY, &alice()), 100);
    assert_eq!(world.ledger.series(MATURITY).unwrap().balance_of(&alice()), 500);

    // 2 WETH at 200 / 1.5 = 266 < 400
    assert!(matches!(world.withdraw(&weth, alice(), 1), Err(Error::InsufficientCollateral { .. })));
    assert_eq!(
        world.ledger.locked(&weth, &alice(), &world.indices, &world.oracle).unwrap(),
        mul_div_ceil(400, RAY * 3 / 2, 200 * RAY).unwrap()
    );
}

#[test]
fn test_delegated_redemption() {
    let mut world = World::new();
    let chai = CollateralId::chai();
    world.post(&chai, alice(), 100).unwrap();
    world.borrow(&chai, MATURITY, alice(), 100).unwrap();
    world.ledger.mature_all(MATURITY, &world.indices).unwrap();

    let series = world.ledger.series_mut(MATURITY).unwrap();
    series.add_delegate(alice(), bob()).unwrap();
    assert!(matches!(series.add_delegate(alice(), bob()), Err(Error::AlreadyDelegated { .. })));
    assert!(matches!(series.revoke_delegate(bob(), alice()), Err(Error::NotDelegated { .. })));

    let before = world.base_of(&bob());
    world
        .ledger
        .series_mut(MATURITY)
        .unwrap()
        .redeem(bob(), alice(), bob(), 60, &world.indices, &mut world.custody)
        .unwrap();
    assert_eq!(world.base_of(&bob()), before + 60);
    assert_eq!(world.ledger.series(MATURITY).unwrap().balance_of(&alice()), 40);
}

// ═══════════════════════════════════════════════════════════════════════════════
// FLASH ISSUANCE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

struct Holder;

impl FlashIssueReceiver for Holder {
    fn on_flash_issue(
        &mut self,
        token: &mut MaturityToken,
        receiver: Address,
        amount: u128,
        _data: &[u8],
    ) -> Result<()> {
        if token.balance_of(&receiver) < amount {
            return Err(Error::InvariantViolation("issued tokens missing".into()));
        }
        Ok(())
    }
}

struct NestedRedeem<'a> {
    indices: &'a ManualIndexSource,
    custody: &'a mut InMemoryCustody,
}

impl FlashIssueReceiver for NestedRedeem<'_> {
    fn on_flash_issue(
        &mut self,
        token: &mut MaturityToken,
        receiver: Address,
        amount: u128,
        _data: &[u8],
    ) -> Result<()> {
        token.redeem(receiver, receiver, receiver, amount, self.indices, &mut *self.custody)?;
        Ok(())
    }
}

#[test]
fn test_flash_issue_leaves_ledger_unchanged() {
    let mut world = World::new();
    let chai = CollateralId::chai();
    world.post(&chai, alice(), 100).unwrap();
    world.borrow(&chai, MATURITY, alice(), 100).unwrap();
    let before = world.ledger.state_hash();

    world
        .ledger
        .series_mut(MATURITY)
        .unwrap()
        .flash_issue(bob(), 1_000_000, b"DATA", &mut Holder)
        .unwrap();

    assert_eq!(world.ledger.state_hash(), before);
    assert_eq!(world.ledger.series(MATURITY).unwrap().total_supply(), 100);
    assert_eq!(
        world.ledger.series(MATURITY).unwrap().events().last(),
        Some(&LedgerEvent::FlashIssued { maturity: MATURITY, receiver: bob(), amount: 1_000_000 })
    );
}

#[test]
fn test_nested_redeem_is_locked() {
    let mut world = World::new();
    world.ledger.mature_all(MATURITY, &world.indices).unwrap();
    let reserve = world.custody.reserve_of(&Asset::Base);

    let mut nested = NestedRedeem {
        indices: &world.indices,
        custody: &mut world.custody,
    };
    let result = world
        .ledger
        .series_mut(MATURITY)
        .unwrap()
        .flash_issue(bob(), 10, b"DATA", &mut nested);

    assert_eq!(result, Err(Error::Locked));
    assert_eq!(world.custody.reserve_of(&Asset::Base), reserve);
    assert_eq!(world.ledger.series(MATURITY).unwrap().total_supply(), 0);
}

#[test]
fn test_flash_issue_supply_limit() {
    let mut world = World::new();
    let chai = CollateralId::chai();
    let half = 1u128 << 111;
    world
        .custody
        .mint(Asset::Collateral(chai.clone()), alice(), half)
        .unwrap();
    world.post(&chai, alice(), half).unwrap();
    world.borrow(&chai, MATURITY, alice(), half).unwrap();

    let series = world.ledger.series_mut(MATURITY).unwrap();

    assert_eq!(
        series.flash_issue(bob(), half, b"DATA", &mut Holder),
        Err(Error::SupplyLimitExceeded { requested: SUPPLY_LIMIT, limit: SUPPLY_LIMIT })
    );
    assert_eq!(series.total_supply(), half);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_ledger_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    LedgerParams::default()
        .with_collateral(CollateralId::chai(), ray(11, 10))
        .save(&path)
        .unwrap();

    let mut world = World::new();
    world.ledger = PositionLedger::new(LedgerParams::load(&path).unwrap()).unwrap();
    world.ledger.create_series(MATURITY, NOW).unwrap();

    let chai = CollateralId::chai();
    world.post(&chai, alice(), 110).unwrap();
    assert_eq!(world.ledger.power_of(&chai, &alice(), &world.oracle).unwrap(), 100);

    let restored = PositionLedger::from_bytes(&world.ledger.to_bytes().unwrap()).unwrap();
    assert_eq!(restored.state_hash(), world.ledger.state_hash());
    assert_eq!(restored.params(), world.ledger.params());
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Op {
    Post(u128),
    Withdraw(u128),
    Borrow(bool, u128),
    RepayFyDai(bool, u128),
    RepayDai(bool, u128),
    Grow(u128),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u128..5_000).prop_map(Op::Post),
        (1u128..5_000).prop_map(Op::Withdraw),
        (any::<bool>(), 1u128..5_000).prop_map(|(later, a)| Op::Borrow(later, a)),
        (any::<bool>(), 1u128..5_000).prop_map(|(later, a)| Op::RepayFyDai(later, a)),
        (any::<bool>(), 1u128..5_000).prop_map(|(later, a)| Op::RepayDai(later, a)),
        (0u128..2_000).prop_map(Op::Grow),
    ]
}

proptest! {
    #[test]
    fn prop_power_covers_debt_after_every_call(
        ops in prop::collection::vec(op(), 1..40),
        weth in any::<bool>(),
    ) {
        let mut world = World::new();
        let collateral = if weth { CollateralId::weth() } else { CollateralId::chai() };
        world.ledger.mature_all(MATURITY, &world.indices).unwrap();
        let mut borrow_index = RAY;
        let mut savings_index = RAY;

        for op in ops {
            let maturity = |later: bool| if later { LATER } else { MATURITY };
            let checked = match op {
                Op::Post(a) => {
                    let _ = world.post(&collateral, alice(), a);
                    false
                }
                Op::Withdraw(a) => world.withdraw(&collateral, alice(), a).is_ok(),
                Op::Borrow(later, a) => world.borrow(&collateral, maturity(later), alice(), a).is_ok(),
                Op::RepayFyDai(later, a) => {
                    let _ = world.ledger.repay_fy_dai(&collateral, maturity(later), alice(), alice(), a);
                    false
                }
                Op::RepayDai(later, a) => {
                    let _ = world.repay_dai(&collateral, maturity(later), alice(), a);
                    false
                }
                Op::Grow(step) => {
                    // one basis point of borrow cost per step, half of it to savings
                    borrow_index += step * RAY / 10_000;
                    savings_index += step * RAY / 20_000;
                    world.indices.set_borrow(Ray::from_raw(borrow_index));
                    world.indices.set_savings(Ray::from_raw(savings_index));
                    false
                }
            };

            // only calls that add risk are checked; growth alone may outrun power
            if checked {
                prop_assert!(world
                    .ledger
                    .is_collateralized(&collateral, &alice(), &world.indices, &world.oracle)
                    .unwrap());
            }
            for maturity in [MATURITY, LATER] {
                let series = world.ledger.series(maturity).unwrap();
                prop_assert!(series.verify_supply_invariant());
                prop_assert!(
                    series.savings_growth(&world.indices).unwrap()
                        <= series.borrow_cost_growth(&world.indices).unwrap()
                );
            }
        }
    }

    #[test]
    fn prop_without_growth_power_always_covers_debt(
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let mut world = World::new();
        let chai = CollateralId::chai();

        for op in ops {
            let maturity = |later: bool| if later { LATER } else { MATURITY };
            let _ = match op {
                Op::Post(a) => world.post(&chai, alice(), a),
                Op::Withdraw(a) => world.withdraw(&chai, alice(), a),
                Op::Borrow(later, a) => world.borrow(&chai, maturity(later), alice(), a),
                Op::RepayFyDai(later, a) => world
                    .ledger
                    .repay_fy_dai(&chai, maturity(later), alice(), alice(), a)
                    .map(|_| ()),
                Op::RepayDai(later, a) => world.repay_dai(&chai, maturity(later), alice(), a).map(|_| ()),
                Op::Grow(_) => Ok(()),
            };

            let power = world.ledger.power_of(&chai, &alice(), &world.oracle).unwrap();
            let debt = world.ledger.total_debt_dai(&chai, &alice(), &world.indices).unwrap();
            prop_assert!(power >= debt);
        }
    }
}
