use std::time::Duration;

/// Engine configuration.
///
/// Prices are in the smallest currency unit and apply when the caller does
/// not fix a price explicitly (lifecycle-item preparation, transfers).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Years added by a register/renew operation.
    pub renew_years: u32,
    /// Price of a register/renew/external-transfer item.
    pub domain_price: u64,
    /// Price of a restore item.
    pub restore_price: u64,
    /// Orders with failed/executing items older than this are retry candidates.
    pub stale_order_window: Duration,
    /// Our own registrar id; transfers from it are internal take-overs.
    pub registrar_id: String,
    /// Auction house registrar; transfers from it are free like internal ones.
    pub auction_registrar_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            renew_years: 2,
            domain_price: 10_000,
            restore_price: 15_000,
            stale_order_window: Duration::from_secs(5 * 60),
            registrar_id: "namegrid_registrar".to_string(),
            auction_registrar_id: None,
        }
    }
}

impl EngineConfig {
    pub fn with_renew_years(mut self, years: u32) -> Self {
        self.renew_years = years;
        self
    }

    pub fn with_domain_price(mut self, price: u64) -> Self {
        self.domain_price = price;
        self
    }

    pub fn with_restore_price(mut self, price: u64) -> Self {
        self.restore_price = price;
        self
    }

    pub fn with_stale_order_window(mut self, window: Duration) -> Self {
        self.stale_order_window = window;
        self
    }

    pub fn with_registrar_id(mut self, id: impl Into<String>) -> Self {
        self.registrar_id = id.into();
        self
    }

    pub fn with_auction_registrar_id(mut self, id: impl Into<String>) -> Self {
        self.auction_registrar_id = Some(id.into());
        self
    }
}
