//! The request orchestrator: cache-check, coverage-check, database or
//! explorer serve, then fire-and-forget background fills for whatever was
//! missing.

use std::sync::Arc;

use chrono::DateTime;
use tracing::{debug, error, info, warn};

use crate::cache::CacheKey;
use crate::coverage::find_gaps;
use crate::db;
use crate::error::ServiceError;
use crate::models::{
    BalanceResponse, BlockRange, CountResponse, DataSource, Pagination, QueryMetadata, SortOrder,
    Transaction, TransactionsResponse,
};
use crate::state::AppState;
use crate::validation::{
    validate_address, validate_block_range, validate_pagination, ValidatedAddress,
};

#[derive(Clone)]
pub struct TransactionService {
    state: Arc<AppState>,
}

impl TransactionService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Paginated transaction query over a block range. Serves from KV cache,
    /// the durable store, or the explorer depending on coverage; every
    /// missing sub-range is handed to the background scheduler.
    pub async fn get_transactions(
        &self,
        address: &str,
        from_block: Option<u64>,
        to_block: Option<u64>,
        page: u32,
        limit: u32,
        order: SortOrder,
    ) -> Result<TransactionsResponse, ServiceError> {
        let addr = validate_address(address)?;
        validate_block_range(from_block, to_block)?;
        validate_pagination(page, limit)?;

        // Effective bounds: creation block (contracts) or genesis on the low
        // end, chain head on the high end.
        let eff_from = match from_block {
            Some(from) => from,
            None => {
                self.state
                    .resolver
                    .starting_block_for(&addr.normalized)
                    .await
            }
        };
        let eff_to = match to_block {
            Some(to) => to,
            None => self.state.rpc.get_block_number().await?,
        };

        // A contract created after an explicit `to` bound has nothing in
        // range; answer empty without touching upstream.
        if eff_from > eff_to {
            debug!(
                address = %addr.normalized,
                eff_from, eff_to,
                "effective range is empty"
            );
            return Ok(self.build_response(
                &addr,
                Vec::new(),
                eff_from,
                eff_to,
                page,
                limit,
                DataSource::Database,
                false,
                false,
            ));
        }

        let key = CacheKey::tx_query(&addr.normalized, eff_from, eff_to, page, limit, order);
        if let Some(hit) = self.state.cache.transactions.get_query(&key).await {
            return Ok(hit);
        }

        let coverage_rows =
            db::coverage::get_overlapping(&self.state.db_pool, &addr.normalized, eff_from, eff_to)
                .await?;
        let covered: Vec<BlockRange> = coverage_rows.iter().map(|c| c.range()).collect();
        let gaps = find_gaps(&covered, eff_from, eff_to);

        let response = if gaps.is_empty() {
            let transactions = db::transaction::get_transactions(
                &self.state.db_pool,
                &addr.normalized,
                eff_from,
                eff_to,
                page,
                limit,
                order,
            )
            .await?;
            self.build_response(
                &addr,
                transactions,
                eff_from,
                eff_to,
                page,
                limit,
                DataSource::Database,
                false,
                false,
            )
        } else {
            self.serve_from_explorer(&addr, eff_from, eff_to, page, limit, order)
                .await?
        };

        // Cache after the response exists; a best-effort write that two
        // concurrent identical queries may both perform.
        self.state
            .cache
            .transactions
            .insert_query(key, response.clone())
            .await;

        self.schedule_gap_fill(&addr.normalized, gaps);

        Ok(response)
    }

    /// One upstream page serves the request; on a query timeout, retry once
    /// with the half of the range the requested order reads first, and fall
    /// back to the durable store if the retry fails too.
    #[allow(clippy::too_many_arguments)]
    async fn serve_from_explorer(
        &self,
        addr: &ValidatedAddress,
        eff_from: u64,
        eff_to: u64,
        page: u32,
        limit: u32,
        order: SortOrder,
    ) -> Result<TransactionsResponse, ServiceError> {
        match self
            .explorer_page(addr, eff_from, eff_to, page, limit, order)
            .await
        {
            Ok(transactions) => Ok(self.build_response(
                addr,
                transactions,
                eff_from,
                eff_to,
                page,
                limit,
                DataSource::Explorer,
                true,
                false,
            )),
            Err(e) if e.is_timeout() => {
                let mid = eff_from + (eff_to - eff_from) / 2;
                let (retry_from, retry_to) = match order {
                    SortOrder::Asc => (eff_from, mid),
                    SortOrder::Desc => (mid + 1, eff_to),
                };
                warn!(
                    address = %addr.normalized,
                    retry_from, retry_to,
                    "explorer timed out, retrying with halved range"
                );
                match self
                    .explorer_page(addr, retry_from, retry_to, page, limit, order)
                    .await
                {
                    Ok(transactions) => Ok(self.build_response(
                        addr,
                        transactions,
                        eff_from,
                        eff_to,
                        page,
                        limit,
                        DataSource::Explorer,
                        true,
                        false,
                    )),
                    Err(retry_err) => {
                        // Serve whatever the database has rather than fail
                        // the read; the payload is flagged incomplete.
                        warn!(
                            address = %addr.normalized,
                            error = %retry_err,
                            "halved retry failed, serving incomplete data from database"
                        );
                        let transactions = db::transaction::get_transactions(
                            &self.state.db_pool,
                            &addr.normalized,
                            eff_from,
                            eff_to,
                            page,
                            limit,
                            order,
                        )
                        .await?;
                        Ok(self.build_response(
                            addr,
                            transactions,
                            eff_from,
                            eff_to,
                            page,
                            limit,
                            DataSource::Database,
                            true,
                            true,
                        ))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn explorer_page(
        &self,
        addr: &ValidatedAddress,
        from_block: u64,
        to_block: u64,
        page: u32,
        limit: u32,
        order: SortOrder,
    ) -> Result<Vec<Transaction>, ServiceError> {
        let entries = self
            .state
            .explorer
            .txlist(&addr.normalized, from_block, to_block, page, limit, order)
            .await?;
        entries
            .into_iter()
            .map(|e| e.into_transaction(&addr.normalized))
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn build_response(
        &self,
        addr: &ValidatedAddress,
        transactions: Vec<Transaction>,
        from_block: u64,
        to_block: u64,
        page: u32,
        limit: u32,
        source: DataSource,
        background_processing: bool,
        incomplete: bool,
    ) -> TransactionsResponse {
        let has_more = transactions.len() as u32 == limit;
        TransactionsResponse {
            transactions,
            from_cache: false,
            pagination: Pagination {
                page,
                limit,
                has_more,
            },
            metadata: QueryMetadata {
                address: addr.checksummed.clone(),
                from_block,
                to_block,
                source,
                background_processing: background_processing.then_some(true),
                incomplete: incomplete.then_some(true),
            },
        }
    }

    /// Fire-and-forget: the response is never blocked on the enqueue being
    /// durable, and enqueue failures only log.
    fn schedule_gap_fill(&self, address: &str, gaps: Vec<BlockRange>) {
        if gaps.is_empty() {
            return;
        }
        let scheduler = self.state.scheduler.clone();
        let address = address.to_string();
        tokio::spawn(async move {
            match scheduler.schedule_gaps(&address, &gaps).await {
                Ok(inserted) => {
                    info!(%address, gaps = gaps.len(), inserted, "background fill scheduled");
                }
                Err(e) => {
                    error!(%address, error = %e, "failed to schedule background fill");
                }
            }
        });
    }

    /// Balance lookup: KV, then a provider refresh that also snapshots to
    /// the durable store, then the last durable snapshot when the provider
    /// is unreachable.
    pub async fn get_balance(&self, address: &str) -> Result<BalanceResponse, ServiceError> {
        let addr = validate_address(address)?;

        if let Some(cached) = self.state.cache.balances.get(&addr.normalized).await {
            let age = (db::now_secs() - cached.cached_at).max(0) as u64;
            return Ok(BalanceResponse {
                address: addr.checksummed,
                balance: format_wei_to_eth(&cached.balance),
                balance_wei: cached.balance,
                block_number: cached.block_number,
                last_updated: iso8601(cached.cached_at),
                from_cache: true,
                cache_age: Some(age),
                source: DataSource::Cache,
            });
        }

        match tokio::try_join!(
            self.state.rpc.get_balance(&addr.normalized),
            self.state.rpc.get_block_number(),
        ) {
            Ok((wei, height)) => {
                if let Err(e) =
                    db::balance::upsert(&self.state.db_pool, &addr.normalized, &wei, height).await
                {
                    warn!(address = %addr.normalized, error = %e, "balance snapshot upsert failed");
                }
                self.state
                    .cache
                    .balances
                    .insert(&addr.normalized, &wei, height)
                    .await;
                Ok(BalanceResponse {
                    address: addr.checksummed,
                    balance: format_wei_to_eth(&wei),
                    balance_wei: wei,
                    block_number: height,
                    last_updated: iso8601(db::now_secs()),
                    from_cache: false,
                    cache_age: None,
                    source: DataSource::Provider,
                })
            }
            Err(upstream_err) => {
                match db::balance::get(&self.state.db_pool, &addr.normalized).await? {
                    Some(snapshot) => {
                        warn!(
                            address = %addr.normalized,
                            error = %upstream_err,
                            "provider unreachable, serving stored balance snapshot"
                        );
                        Ok(BalanceResponse {
                            address: addr.checksummed,
                            balance: format_wei_to_eth(&snapshot.balance),
                            balance_wei: snapshot.balance.clone(),
                            block_number: snapshot.block_number as u64,
                            last_updated: iso8601(snapshot.updated_at),
                            from_cache: false,
                            cache_age: None,
                            source: DataSource::Database,
                        })
                    }
                    None => Err(upstream_err),
                }
            }
        }
    }

    /// Number of transactions stored locally for an address.
    pub async fn get_stored_count(&self, address: &str) -> Result<CountResponse, ServiceError> {
        let addr = validate_address(address)?;
        let key = CacheKey::tx_count(&addr.normalized);

        if let Some(count) = self.state.cache.transactions.get_count(&key).await {
            return Ok(CountResponse {
                address: addr.checksummed,
                count,
                from_cache: true,
                source: DataSource::Cache,
            });
        }

        let count = db::transaction::count_transactions(&self.state.db_pool, &addr.normalized).await?;
        self.state
            .cache
            .transactions
            .insert_count(key, count)
            .await;

        Ok(CountResponse {
            address: addr.checksummed,
            count,
            from_cache: false,
            source: DataSource::Database,
        })
    }
}

/// Shift a wei decimal string 18 places to express ETH. Pure string work;
/// no arithmetic is ever performed on balances.
pub fn format_wei_to_eth(wei: &str) -> String {
    let wei = wei.trim();
    if wei.is_empty() || !wei.bytes().all(|b| b.is_ascii_digit()) {
        return "0".to_string();
    }
    let wei = wei.trim_start_matches('0');
    if wei.is_empty() {
        return "0".to_string();
    }

    if wei.len() <= 18 {
        let padded = format!("{wei:0>18}");
        let frac = padded.trim_end_matches('0');
        if frac.is_empty() {
            "0".to_string()
        } else {
            format!("0.{frac}")
        }
    } else {
        let (int_part, frac_part) = wei.split_at(wei.len() - 18);
        let frac = frac_part.trim_end_matches('0');
        if frac.is_empty() {
            int_part.to_string()
        } else {
            format!("{int_part}.{frac}")
        }
    }
}

fn iso8601(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wei_to_eth_formatting() {
        assert_eq!(format_wei_to_eth("0"), "0");
        assert_eq!(format_wei_to_eth(""), "0");
        assert_eq!(format_wei_to_eth("1000000000000000000"), "1");
        assert_eq!(format_wei_to_eth("1500000000000000000"), "1.5");
        assert_eq!(format_wei_to_eth("1"), "0.000000000000000001");
        assert_eq!(format_wei_to_eth("14458225000000000"), "0.014458225");
        assert_eq!(
            format_wei_to_eth("123456789012345678901234567890"),
            "123456789012.34567890123456789"
        );
        // Garbage never panics; balances are display-only.
        assert_eq!(format_wei_to_eth("0x10"), "0");
    }

    #[test]
    fn iso8601_formatting() {
        assert_eq!(iso8601(0), "1970-01-01T00:00:00+00:00");
        assert!(iso8601(1_513_240_363).starts_with("2017-12-14"));
    }
}
