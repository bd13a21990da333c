//! Gap-limit discovery for a single BIP44 chain
//!
//! A chain is scanned in windows of exactly `gap_limit` consecutive addresses. Window `k`
//! of a scan starting at `s` covers `[s + k*g, s + (k+1)*g)`, index 0 included. Each window
//! costs one oracle query; the first window with zero activity ends the scan and becomes
//! the chain's unused buffer.

use std::collections::HashSet;
use std::fmt;

use crate::config::GapLimits;
use crate::derivation::KeyDerivation;
use crate::error::DiscoveryError;
use crate::oracle::ActivityOracle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChainKind {
    /// Receiving addresses (`.../0/i`)
    External,
    /// Change addresses (`.../1/i`)
    Internal,
}

impl ChainKind {
    /// BIP44 `change` path component
    pub fn child_index(&self) -> u32 {
        match self {
            ChainKind::External => 0,
            ChainKind::Internal => 1,
        }
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKind::External => write!(f, "external"),
            ChainKind::Internal => write!(f, "internal"),
        }
    }
}

/// Result of a completed scan, not yet applied to any scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub start_index: u32,
    /// One past the last index of the stopping window
    pub next_index: u32,
    /// Every window before the stopping one, in index order
    pub used_batch: Vec<String>,
    /// The stopping (zero-activity) window
    pub unused_batch: Vec<String>,
    pub windows_queried: u32,
}

#[derive(Debug, Clone)]
pub struct ChainScanner {
    chain: ChainKind,
    gap_limit: u32,
    next_index: u32,
    used_addresses: Vec<String>,
    unused_buffer: Vec<String>,
}

impl ChainScanner {
    pub fn new(chain: ChainKind, gap_limits: &GapLimits) -> Self {
        Self {
            chain,
            gap_limit: gap_limits.limit_for(chain),
            next_index: 0,
            used_addresses: Vec::new(),
            unused_buffer: Vec::new(),
        }
    }

    pub fn chain_kind(&self) -> ChainKind {
        self.chain
    }

    pub fn gap_limit(&self) -> u32 {
        self.gap_limit
    }

    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    pub fn used_addresses(&self) -> &[String] {
        &self.used_addresses
    }

    pub fn unused_buffer(&self) -> &[String] {
        &self.unused_buffer
    }

    /// First index of the unused buffer; rescans start here so that the buffer
    /// is either confirmed unused again or promoted to used.
    pub fn resume_index(&self) -> u32 {
        self.next_index - self.unused_buffer.len() as u32
    }

    /// Known addresses in index order (used, then the unused buffer)
    pub fn known_addresses(&self) -> impl Iterator<Item = &String> {
        self.used_addresses.iter().chain(self.unused_buffer.iter())
    }

    pub fn knows_any(&self, addresses: &HashSet<String>) -> bool {
        self.known_addresses().any(|a| addresses.contains(a))
    }

    pub fn unused_intersects(&self, addresses: &HashSet<String>) -> bool {
        self.unused_buffer.iter().any(|a| addresses.contains(a))
    }

    /// Scan forward from `start_index` without touching this scanner's state.
    pub async fn scan<D, O>(
        &self,
        start_index: u32,
        derivation: &D,
        oracle: &O,
    ) -> Result<ScanOutcome, DiscoveryError>
    where
        D: KeyDerivation + ?Sized,
        O: ActivityOracle + ?Sized,
    {
        let mut used_batch = Vec::new();
        let mut window_start = start_index;
        let mut windows_queried = 0u32;

        let mut window = derivation.derive_window(self.chain, window_start, self.gap_limit)?;
        let mut activity = self.query_window(oracle, window_start, &window).await?;
        windows_queried += 1;

        while activity > 0 {
            used_batch.append(&mut window);
            window_start = self.window_after(window_start)?;

            window = derivation.derive_window(self.chain, window_start, self.gap_limit)?;
            activity = self.query_window(oracle, window_start, &window).await?;
            windows_queried += 1;
        }

        Ok(ScanOutcome {
            start_index,
            next_index: self.window_after(window_start)?,
            used_batch,
            unused_batch: window,
            windows_queried,
        })
    }

    /// Scan from the resume index and commit the outcome.
    ///
    /// On error nothing is committed; the scanner stays exactly as it was.
    pub async fn rescan<D, O>(&mut self, derivation: &D, oracle: &O) -> Result<(), DiscoveryError>
    where
        D: KeyDerivation + ?Sized,
        O: ActivityOracle + ?Sized,
    {
        let outcome = self.scan(self.resume_index(), derivation, oracle).await?;
        self.commit(outcome);
        Ok(())
    }

    /// Treat the unused buffer as used and scan on from `next_index`.
    ///
    /// The buffer is promoted only together with a successful scan; on error the
    /// scanner stays exactly as it was.
    pub async fn advance<D, O>(&mut self, derivation: &D, oracle: &O) -> Result<(), DiscoveryError>
    where
        D: KeyDerivation + ?Sized,
        O: ActivityOracle + ?Sized,
    {
        let outcome = self.scan(self.next_index, derivation, oracle).await?;
        let promoted = std::mem::take(&mut self.unused_buffer);
        self.used_addresses.extend(promoted);
        self.commit(outcome);
        Ok(())
    }

    pub(crate) fn commit(&mut self, outcome: ScanOutcome) {
        debug_assert_eq!(outcome.start_index, self.resume_index());

        log::info!(
            "{} chain: {} windows queried, {} new used, next index {} -> {}",
            self.chain,
            outcome.windows_queried,
            outcome.used_batch.len(),
            self.next_index,
            outcome.next_index
        );

        self.next_index = outcome.next_index;
        self.used_addresses.extend(outcome.used_batch);
        self.unused_buffer = outcome.unused_batch;
    }

    async fn query_window<O>(
        &self,
        oracle: &O,
        window_start: u32,
        window: &[String],
    ) -> Result<u64, DiscoveryError>
    where
        O: ActivityOracle + ?Sized,
    {
        let activity = oracle.query_activity(window).await.map_err(|e| {
            log::warn!(
                "{} chain: window at {} failed: {}",
                self.chain,
                window_start,
                e
            );
            e
        })?;
        log::debug!(
            "{} chain: window [{}, {}) -> {} txs",
            self.chain,
            window_start,
            window_start as u64 + window.len() as u64,
            activity
        );
        Ok(activity)
    }

    fn window_after(&self, window_start: u32) -> Result<u32, DiscoveryError> {
        window_start.checked_add(self.gap_limit).ok_or_else(|| {
            DiscoveryError::Derivation(format!("{} chain exhausted at {}", self.chain, window_start))
        })
    }
}
