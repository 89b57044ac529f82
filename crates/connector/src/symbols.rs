//! Bidirectional trading pair <-> exchange symbol mapping
//!
//! The table is rebuilt wholesale from each exchange-info snapshot and swapped
//! in atomically. Readers load the current `Arc<SymbolMap>` without locking and
//! always see a complete table.

use apiengine_core::{TradingPair, combine_pair};
use arc_swap::ArcSwap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::TRADING_STATUS;
use crate::error::{ConnectorError, Result};

/// How a symbol without a reported status is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingStatusPolicy {
    /// Missing status means trading is enabled
    #[default]
    AssumeTrading,
    /// Missing status means the symbol is halted
    AssumeHalted,
}

/// One symbol as reported by the exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub exchange_symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub status: Option<String>,
}

impl SymbolEntry {
    pub fn canonical_pair(&self) -> TradingPair {
        combine_pair(&self.base_asset, &self.quote_asset)
    }
}

/// Immutable snapshot of the mapping in both directions
#[derive(Debug, Default)]
pub struct SymbolMap {
    to_exchange: HashMap<TradingPair, String>,
    to_canonical: HashMap<String, TradingPair>,
    status: HashMap<TradingPair, Option<String>>,
}

impl SymbolMap {
    /// Build from a snapshot, rejecting any pair or symbol that appears twice
    pub fn build(entries: &[SymbolEntry]) -> Result<Self> {
        let mut map = Self::default();
        for entry in entries {
            let pair = entry.canonical_pair();
            if let Some(existing) = map.to_exchange.get(&pair) {
                return Err(ConnectorError::SymbolConflict(format!(
                    "{} maps to both {} and {}",
                    pair, existing, entry.exchange_symbol
                )));
            }
            if let Some(existing) = map.to_canonical.get(&entry.exchange_symbol) {
                return Err(ConnectorError::SymbolConflict(format!(
                    "{} maps to both {} and {}",
                    entry.exchange_symbol, existing, pair
                )));
            }
            map.to_exchange
                .insert(pair.clone(), entry.exchange_symbol.clone());
            map.to_canonical
                .insert(entry.exchange_symbol.clone(), pair.clone());
            map.status.insert(pair, entry.status.clone());
        }
        Ok(map)
    }

    pub fn to_exchange_symbol(&self, pair: &str) -> Result<String> {
        self.to_exchange
            .get(pair)
            .cloned()
            .ok_or_else(|| ConnectorError::UnknownPair(pair.to_string()))
    }

    pub fn to_canonical_pair(&self, symbol: &str) -> Result<TradingPair> {
        self.to_canonical
            .get(symbol)
            .cloned()
            .ok_or_else(|| ConnectorError::UnknownSymbol(symbol.to_string()))
    }

    pub fn len(&self) -> usize {
        self.to_exchange.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_exchange.is_empty()
    }
}

/// Shared, atomically refreshed symbol table
pub struct SymbolTable {
    current: ArcSwap<SymbolMap>,
    missing_status: MissingStatusPolicy,
}

impl SymbolTable {
    /// Empty table; every lookup fails until the first refresh
    pub fn new(missing_status: MissingStatusPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(SymbolMap::default()),
            missing_status,
        }
    }

    pub fn to_exchange_symbol(&self, pair: &str) -> Result<String> {
        self.current.load().to_exchange_symbol(pair)
    }

    pub fn to_canonical_pair(&self, symbol: &str) -> Result<TradingPair> {
        self.current.load().to_canonical_pair(symbol)
    }

    /// Replace the whole table. On a conflicting snapshot the previous table
    /// stays in place.
    pub fn refresh(&self, entries: &[SymbolEntry]) -> Result<()> {
        let map = SymbolMap::build(entries)?;
        let count = map.len();
        self.current.store(Arc::new(map));
        info!("Symbol table refreshed with {} symbols", count);
        Ok(())
    }

    /// Whether `pair` is known and open for trading
    pub fn is_tradable(&self, pair: &str) -> bool {
        let map = self.current.load();
        match map.status.get(pair) {
            None => false,
            Some(Some(status)) => status == TRADING_STATUS,
            Some(None) => {
                debug!("{} has no reported status, applying {:?}", pair, self.missing_status);
                self.missing_status == MissingStatusPolicy::AssumeTrading
            }
        }
    }

    /// Current table, for several lookups against one consistent snapshot
    pub fn snapshot(&self) -> Arc<SymbolMap> {
        self.current.load_full()
    }

    /// Known canonical pairs, sorted
    pub fn pairs(&self) -> Vec<TradingPair> {
        let mut pairs: Vec<TradingPair> = self.current.load().to_exchange.keys().cloned().collect();
        pairs.sort();
        pairs
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new(MissingStatusPolicy::default())
    }
}
