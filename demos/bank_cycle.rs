//! Bank Cycle Demo - Breaking a constructor cycle with a forwarding stand-in
//!
//! This example demonstrates:
//! - Two services that need each other through their constructors
//! - A `Proxy<dyn Account>` stand-in registered for the abstraction
//! - State written through the real account being visible through the stand-in
//! - The errors reported for unbreakable cycles and for early stand-in use
//!
//! Step 3 prints the stand-in's panic message before the injector reports it as an error.

use graft_di::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

trait Account: Send + Sync {
    fn deposit(&self, amount: i64);
    fn balance(&self) -> i64;
}

trait Auditor: Send + Sync {
    fn report(&self) -> String;
}

impl Account for Proxy<dyn Account> {
    fn deposit(&self, amount: i64) {
        self.target().deposit(amount)
    }

    fn balance(&self) -> i64 {
        self.target().balance()
    }
}

struct CheckingAccount {
    balance: Mutex<i64>,
    auditor: Arc<dyn Auditor>,
}

impl Account for CheckingAccount {
    fn deposit(&self, amount: i64) {
        *self.balance.lock() += amount;
        println!("  deposited {} -> {}", amount, self.auditor.report());
    }

    fn balance(&self) -> i64 {
        *self.balance.lock()
    }
}

impl Injectable for CheckingAccount {
    type Deps = (Arc<dyn Auditor>,);
    fn construct((auditor,): Self::Deps) -> Self {
        CheckingAccount {
            balance: Mutex::new(0),
            auditor,
        }
    }
}

struct BalanceAuditor {
    account: Arc<dyn Account>,
}

impl Auditor for BalanceAuditor {
    fn report(&self) -> String {
        format!("audited balance {}", self.account.balance())
    }
}

impl Injectable for BalanceAuditor {
    type Deps = (Arc<dyn Account>,);
    fn construct((account,): Self::Deps) -> Self {
        BalanceAuditor { account }
    }
}

/// Reads the balance while being constructed, before the account exists.
struct NosyAuditor {
    _seen: i64,
}

impl Auditor for NosyAuditor {
    fn report(&self) -> String {
        "nosy".to_string()
    }
}

impl Injectable for NosyAuditor {
    type Deps = (Arc<dyn Account>,);
    fn construct((account,): Self::Deps) -> Self {
        NosyAuditor {
            _seen: account.balance(),
        }
    }
}

fn bank(nosy: bool, with_stand_in: bool) -> DiResult<Injector> {
    let auditor = if nosy {
        Binding::bind::<dyn Auditor>().to::<NosyAuditor, _>(|a| a as Arc<dyn Auditor>)
    } else {
        Binding::bind::<dyn Auditor>().to::<BalanceAuditor, _>(|a| a as Arc<dyn Auditor>)
    };

    let mut builder = Injector::builder()
        .register_binding(
            Binding::bind::<dyn Account>()
                .to::<CheckingAccount, _>(|a| a as Arc<dyn Account>)
                .singleton(),
        )?
        .register_binding(auditor.singleton())?
        .add_observer(Arc::new(LoggingObserver::with_label("bank")));
    if with_stand_in {
        builder = builder.stand_in::<dyn Account, _>(|proxy| proxy as Arc<dyn Account>)?;
    }
    builder.build()
}

fn main() -> DiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("\n1. Account <-> Auditor, broken by a stand-in for dyn Account");
    let injector = bank(false, true)?;
    let account = injector.get::<dyn Account>()?;
    account.deposit(100);
    account.deposit(25);
    println!("  auditor sees: {}", injector.get::<dyn Auditor>()?.report());

    println!("\n2. Same graph without a stand-in");
    match bank(false, false)?.get::<dyn Account>() {
        Err(err) => println!("  {}", err),
        Ok(_) => println!("  unexpectedly resolved"),
    }

    println!("\n3. An auditor that uses the account during construction");
    match bank(true, true)?.get::<dyn Account>() {
        Err(err) => println!("  {}", err),
        Ok(_) => println!("  unexpectedly resolved"),
    }

    Ok(())
}
