// src/price/cache.rs
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::future::try_join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

use crate::domain::errors::{PriceError, PriceResult};
use crate::domain::models::{Price, Security, Stock};
use crate::domain::repository::PriceHistoryProvider;

/// Price history per ISIN, newest first
pub type PriceMap = HashMap<String, Vec<Price>>;

/// Point-in-time price lookup over histories fetched from a provider.
///
/// Lookups never fail: unknown securities and dates before the first known
/// price are worth zero. Refreshes build a complete new map and swap it in, so
/// readers see either the old or the new histories, never a mix.
pub struct PriceCache {
    provider: Arc<dyn PriceHistoryProvider>,
    prices: RwLock<Arc<PriceMap>>,
    // serializes refreshes; lookups never take it
    refresh: Mutex<()>,
}

impl PriceCache {
    pub fn new(provider: Arc<dyn PriceHistoryProvider>) -> Self {
        Self {
            provider,
            prices: RwLock::new(Arc::new(PriceMap::new())),
            refresh: Mutex::new(()),
        }
    }

    /// Price of the most recent point on or before `date`, zero if none
    pub fn price(&self, security: &Security, date: NaiveDate) -> Decimal {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);

        let Some(history) = prices.get(&security.isin) else {
            return Decimal::ZERO;
        };
        let idx = history.partition_point(|p| p.date > date);
        history.get(idx).map(|p| p.price).unwrap_or(Decimal::ZERO)
    }

    /// Same as [`PriceCache::price`], discarding the time of day
    pub fn price_at(&self, security: &Security, at: DateTime<Utc>) -> Decimal {
        self.price(security, at.date_naive())
    }

    /// Borrow the cache as a plain price function
    pub fn price_func(&self) -> impl Fn(&Security, NaiveDate) -> Decimal + '_ {
        move |security: &Security, date: NaiveDate| self.price(security, date)
    }

    /// Current histories; later refreshes do not change the returned map
    pub fn snapshot(&self) -> Arc<PriceMap> {
        self.prices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace every history with a fresh copy from the provider.
    ///
    /// All fetches must succeed before anything is replaced. On error, or when
    /// the returned future is dropped before completion, the previous
    /// histories stay in place.
    pub async fn update_history(&self, stocks: &[Stock]) -> PriceResult<()> {
        let _guard = self.refresh.lock().await;

        let fetches = stocks.iter().map(|stock| {
            let security = stock.security.clone();
            async move {
                let mut history = self
                    .provider
                    .history(&security)
                    .await
                    .map_err(|e| refresh_error(&security, e))?;
                history.sort_by(|a, b| b.date.cmp(&a.date));
                Ok::<_, PriceError>((security.isin.clone(), history))
            }
        });
        let prices: PriceMap = try_join_all(fetches).await?.into_iter().collect();

        let points: usize = prices.values().map(|h| h.len()).sum();
        self.swap(prices);
        log::info!("Price history updated: {} stocks, {} points", stocks.len(), points);

        Ok(())
    }

    /// Record each stock's current quote as its price for `today`
    pub async fn update_current(&self, stocks: &[Stock], today: NaiveDate) -> PriceResult<()> {
        let _guard = self.refresh.lock().await;

        let fetches = stocks.iter().map(|stock| {
            let security = stock.security.clone();
            async move {
                let price = self
                    .provider
                    .current_price(&security)
                    .await
                    .map_err(|e| refresh_error(&security, e))?;
                Ok::<_, PriceError>((security.isin.clone(), price))
            }
        });
        let quotes = try_join_all(fetches).await?;

        let mut prices = PriceMap::clone(&self.snapshot());
        for (isin, price) in quotes {
            let history = prices.entry(isin).or_default();
            history.retain(|p| p.date != today);
            history.push(Price::new(today, price));
            history.sort_by(|a, b| b.date.cmp(&a.date));
        }
        self.swap(prices);
        log::info!("Current prices updated for {} stocks", stocks.len());

        Ok(())
    }

    fn swap(&self, prices: PriceMap) {
        let mut current = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(prices);
    }
}

fn refresh_error(security: &Security, source: PriceError) -> PriceError {
    log::error!("Error fetching prices for {}: {}", security, source);
    PriceError::Refresh {
        isin: security.isin.clone(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::date;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::time::Duration;

    const TESLA: &str = "US88160R1014";

    #[derive(Default)]
    struct MockProvider {
        prices: HashMap<String, Vec<Price>>,
        current: HashMap<String, Decimal>,
        failing: HashSet<String>,
        hanging: HashSet<String>,
    }

    #[async_trait]
    impl PriceHistoryProvider for MockProvider {
        async fn history(&self, security: &Security) -> PriceResult<Vec<Price>> {
            if self.hanging.contains(&security.isin) {
                std::future::pending::<()>().await;
            }
            if self.failing.contains(&security.isin) {
                return Err(PriceError::Provider("service unavailable".to_string()));
            }
            Ok(self.prices.get(&security.isin).cloned().unwrap_or_default())
        }

        async fn current_price(&self, security: &Security) -> PriceResult<Decimal> {
            self.current
                .get(&security.isin)
                .copied()
                .ok_or_else(|| PriceError::NoData(security.isin.clone()))
        }
    }

    fn tesla_history() -> Vec<Price> {
        vec![
            Price::new(date(2020, 11, 19), dec!(499.269989)),
            Price::new(date(2020, 11, 18), dec!(486.640015)),
            Price::new(date(2020, 11, 20), dec!(489.609985)),
            Price::new(date(2020, 11, 24), dec!(555.380005)),
            Price::new(date(2020, 11, 25), dec!(574.000000)),
            Price::new(date(2020, 11, 23), dec!(521.849976)),
        ]
    }

    fn stock(isin: &str) -> Stock {
        Stock::new(Security::new("Stock", None, isin))
    }

    fn tesla_provider() -> MockProvider {
        let mut provider = MockProvider::default();
        provider.prices.insert(TESLA.to_string(), tesla_history());
        provider
    }

    #[tokio::test]
    async fn looks_up_most_recent_price_on_or_before_date() {
        let cache = PriceCache::new(Arc::new(tesla_provider()));
        let tesla = stock(TESLA);
        cache.update_history(&[tesla.clone()]).await.unwrap();

        // too old
        assert_eq!(cache.price(&tesla.security, date(2000, 1, 1)), Decimal::ZERO);
        // exact date
        assert_eq!(cache.price(&tesla.security, date(2020, 11, 23)), dec!(521.849976));
        // weekend falls back to friday
        assert_eq!(cache.price(&tesla.security, date(2020, 11, 22)), dec!(489.609985));
        // too recent
        assert_eq!(cache.price(&tesla.security, date(2020, 12, 1)), dec!(574.000000));
    }

    #[tokio::test]
    async fn time_of_day_is_ignored() {
        let cache = PriceCache::new(Arc::new(tesla_provider()));
        let tesla = stock(TESLA);
        cache.update_history(&[tesla.clone()]).await.unwrap();

        let at = date(2020, 11, 23).and_hms_opt(23, 59, 59).unwrap().and_utc();
        assert_eq!(cache.price_at(&tesla.security, at), dec!(521.849976));
    }

    #[tokio::test]
    async fn unknown_stock_is_worth_zero() {
        let cache = PriceCache::new(Arc::new(tesla_provider()));
        let other = stock("US0378331005");
        assert_eq!(cache.price(&other.security, date(2020, 11, 23)), Decimal::ZERO);

        cache.update_history(&[stock(TESLA)]).await.unwrap();
        assert_eq!(cache.price(&other.security, date(2020, 11, 23)), Decimal::ZERO);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_prices() {
        let mut provider = tesla_provider();
        provider.failing.insert("US0378331005".to_string());
        let cache = PriceCache::new(Arc::new(provider));
        let tesla = stock(TESLA);
        cache.update_history(&[tesla.clone()]).await.unwrap();

        let err = cache
            .update_history(&[tesla.clone(), stock("US0378331005")])
            .await
            .unwrap_err();
        match err {
            PriceError::Refresh { isin, .. } => assert_eq!(isin, "US0378331005"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(cache.price(&tesla.security, date(2020, 11, 23)), dec!(521.849976));
        assert_eq!(cache.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_refresh_keeps_previous_prices() {
        let mut provider = tesla_provider();
        provider.hanging.insert("US0378331005".to_string());
        let cache = PriceCache::new(Arc::new(provider));
        let tesla = stock(TESLA);
        cache.update_history(&[tesla.clone()]).await.unwrap();
        let before = cache.snapshot();

        let both = [tesla.clone(), stock("US0378331005")];
        let refresh = cache.update_history(&both);
        assert!(tokio::time::timeout(Duration::from_millis(20), refresh).await.is_err());

        assert!(Arc::ptr_eq(&before, &cache.snapshot()));
        // the refresh lock was released with the dropped future
        cache.update_history(&[tesla]).await.unwrap();
    }

    #[tokio::test]
    async fn current_price_becomes_todays_point() {
        let mut provider = tesla_provider();
        provider.current.insert(TESLA.to_string(), dec!(580.5));
        let cache = PriceCache::new(Arc::new(provider));
        let tesla = stock(TESLA);
        cache.update_history(&[tesla.clone()]).await.unwrap();

        cache.update_current(&[tesla.clone()], date(2020, 11, 27)).await.unwrap();
        cache.update_current(&[tesla.clone()], date(2020, 11, 27)).await.unwrap();

        assert_eq!(cache.price(&tesla.security, date(2020, 11, 27)), dec!(580.5));
        assert_eq!(cache.price(&tesla.security, date(2020, 11, 26)), dec!(574.000000));
        assert_eq!(cache.snapshot()[TESLA].len(), 7);
    }

    #[tokio::test]
    async fn price_func_reads_through_the_cache() {
        let cache = PriceCache::new(Arc::new(tesla_provider()));
        let tesla = stock(TESLA);
        let price = cache.price_func();
        assert_eq!(price(&tesla.security, date(2020, 11, 23)), Decimal::ZERO);

        cache.update_history(&[tesla.clone()]).await.unwrap();
        assert_eq!(price(&tesla.security, date(2020, 11, 23)), dec!(521.849976));
    }
}
