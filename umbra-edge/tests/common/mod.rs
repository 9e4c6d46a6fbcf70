#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::models::{DrainReport, EodSnapshot, HourlySales, StoreSettings};
use tempfile::TempDir;
use tokio::sync::broadcast;
use umbra_edge::transport::MemoryTransports;
use umbra_edge::{Config, ReportStorage, ServerState};

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

pub fn settings(terminal: u16) -> StoreSettings {
    StoreSettings {
        store_code: "STORE01".into(),
        tenant_name: "UMBRA CAFE".into(),
        terminal,
        contract_number: "C123".into(),
        company_code: "CMP".into(),
        robinson_tenant_code: "TEN12345".into(),
    }
}

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Three invoices: two at 09:00 (600.00), one at 10:00 (400.00)
pub fn snapshot(terminal: u16) -> EodSnapshot {
    let date = date();
    EodSnapshot {
        store_code: "STORE01".into(),
        date,
        terminal,
        z_count: 5,
        old_grand_total: money(5_000_00),
        new_grand_total: money(6_000_00),
        gross_sales: money(1_000_00),
        vatable_sales: money(892_86),
        vat_amount: money(107_14),
        vat_exempt_sales: Decimal::ZERO,
        zero_rated_sales: Decimal::ZERO,
        non_vat_sales: Decimal::ZERO,
        regular_discount: Decimal::ZERO,
        senior_discount: Decimal::ZERO,
        senior_count: 0,
        pwd_discount: Decimal::ZERO,
        pwd_count: 0,
        employee_discount: Decimal::ZERO,
        other_discount: Decimal::ZERO,
        discount_count: 0,
        void_amount: Decimal::ZERO,
        void_count: 0,
        refund_amount: Decimal::ZERO,
        refund_count: 0,
        service_charge: Decimal::ZERO,
        cash_sales: money(1_000_00),
        card_sales: Decimal::ZERO,
        epay_sales: Decimal::ZERO,
        other_sales: Decimal::ZERO,
        first_si: 1,
        last_si: 3,
        transaction_count: 3,
        customer_count: 3,
        hourly: vec![
            HourlySales {
                date,
                hour: 9,
                sales: money(600_00),
                transaction_count: 2,
            },
            HourlySales {
                date,
                hour: 10,
                sales: money(400_00),
                transaction_count: 1,
            },
        ],
    }
}

/// One terminal wired to in-memory malls
pub struct Harness {
    pub dir: TempDir,
    pub state: ServerState,
    pub transports: MemoryTransports,
}

impl Harness {
    pub fn new(terminal: u16) -> Self {
        Self::with_transports(terminal, MemoryTransports::default())
    }

    /// Terminals built from clones of the same transports share the remote malls
    pub fn with_transports(terminal: u16, transports: MemoryTransports) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_testing(dir.path(), settings(terminal));
        // Periodic sweep off; drains only run when triggered
        config.resend.sweep_interval_secs = 0;
        let storage = ReportStorage::open_in_memory().unwrap();
        let state = ServerState::with_parts(config, storage, Arc::new(transports.clone()));
        Self {
            dir,
            state,
            transports,
        }
    }

    pub fn reports_root(&self) -> &std::path::Path {
        self.dir.path()
    }
}

/// Wait for the next cycle that ends a drain worker
pub async fn next_terminal_report(rx: &mut broadcast::Receiver<DrainReport>) -> DrainReport {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let report = rx.recv().await.unwrap();
            if report.is_terminal() {
                return report;
            }
        }
    })
    .await
    .expect("drain did not finish in time")
}

/// Strip the UTF-8 BOM and split into lines
pub fn text_lines(bytes: &[u8]) -> Vec<String> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    String::from_utf8_lossy(body)
        .lines()
        .map(str::to_string)
        .collect()
}
