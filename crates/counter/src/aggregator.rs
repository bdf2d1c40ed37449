//! Counter aggregation: the write path per crash and scope read-back.
use rowkey::{normalize, prefix_end, product_code, RowKeyCodec};
use table::{decode_counter, CellStore, Row, StoreError};

use crate::dimension::{
    Dimension, FAMILY_ARCH, FAMILY_OS, FAMILY_PRODUCT, FAMILY_SIGNATURE, MARKER_FAMILIES,
    QUALIFIER_COUNT, QUALIFIER_NAME,
};
use crate::scope::{Observation, OsScope, ScopeCounts};
use crate::CounterError;

/// What one [`CounterAggregator::record`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Marker cells written (0 when both scopes already existed).
    pub markers_written: usize,
    /// Counter increments applied.
    pub increments: usize,
    /// Store calls repeated after a transient failure.
    pub retries: usize,
}

/// One signature row found under an OS scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureScope {
    /// Human-readable signature text from the marker cell.
    pub signature: String,
    pub counts: ScopeCounts,
}

/// Increments and reads counters for OS and signature scopes.
///
/// Increments are at-least-once: a retried record is counted again. Nothing
/// here deduplicates.
#[derive(Debug, Clone)]
pub struct CounterAggregator<S> {
    store: S,
    codec: RowKeyCodec,
}

impl<S: CellStore> CounterAggregator<S> {
    pub fn new(store: S, codec: RowKeyCodec) -> Self {
        Self { store, codec }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> RowKeyCodec {
        self.codec
    }

    pub fn os_key(&self, scope: &OsScope) -> Vec<u8> {
        self.codec.os_key(&scope.date, &scope.product, &scope.version, &scope.os)
    }

    /// # Errors
    ///
    /// [`CounterError::EmptySignature`] when the signature has no characters
    /// left after normalization: its key would be the OS key.
    pub fn signature_key(&self, scope: &OsScope, signature: &str) -> Result<Vec<u8>, CounterError> {
        if normalize(signature).is_empty() {
            return Err(CounterError::EmptySignature(signature.to_string()));
        }
        Ok(self
            .codec
            .signature_key(&scope.date, &scope.product, &scope.version, &scope.os, signature))
    }

    /// Atomically adds `delta` to one counter cell; returns the new value.
    pub fn increment(&self, scope_key: &[u8], family: &str, qualifier: &str, delta: u64) -> Result<u64, CounterError> {
        Ok(self.store.increment(scope_key, family, qualifier, delta)?)
    }

    /// Marker values already stored under `key`, in [`MARKER_FAMILIES`] order.
    fn stored_markers(&self, key: &[u8], retry: &mut Retry) -> Result<Vec<(&'static str, String)>, CounterError> {
        let mut stored = Vec::new();
        for family in MARKER_FAMILIES {
            if let Some(value) = retry.run(|| self.store.get(key, family, QUALIFIER_NAME))? {
                stored.push((family, String::from_utf8_lossy(&value).into_owned()));
            }
        }
        Ok(stored)
    }

    /// The markers of `expected` that `key` still lacks.
    ///
    /// # Errors
    ///
    /// [`CounterError::ScopeCollision`] when the row carries a marker that
    /// `expected` does not have or names differently: another scope owns the
    /// key.
    fn missing_markers<'m>(
        &self,
        key: &[u8],
        expected: &[(&'static str, &'m str)],
        retry: &mut Retry,
    ) -> Result<Vec<(&'static str, &'m str)>, CounterError> {
        let stored = self.stored_markers(key, retry)?;
        for (family, value) in &stored {
            let owned = expected
                .iter()
                .any(|(f, want)| f == family && same_marker(family, value, want));
            if !owned {
                let stored: Vec<(&str, &str)> = stored.iter().map(|(f, v)| (*f, v.as_str())).collect();
                return Err(CounterError::ScopeCollision {
                    key: String::from_utf8_lossy(key).into_owned(),
                    stored: describe_markers(&stored),
                    requested: describe_markers(expected),
                });
            }
        }
        Ok(expected
            .iter()
            .filter(|(family, _)| !stored.iter().any(|(f, _)| f == family))
            .copied()
            .collect())
    }

    /// Applies one crash to its OS scope and its signature scope.
    ///
    /// Per scope: the scope total, the arch, and for every module and add-on
    /// both the name-only counter and the per-version counter. Markers go in
    /// first, once per new scope key. Both keys are checked for a scope
    /// collision before anything is written.
    pub fn record(&self, scope: &OsScope, signature: &str, observation: &Observation) -> Result<RecordOutcome, CounterError> {
        self.record_with_retries(scope, signature, observation, 0)
    }

    /// [`record`](Self::record), repeating store calls that fail with a
    /// transient error up to `max_retries` times in total. A retried call
    /// resumes at the failed cell, so cells already applied are not counted
    /// again.
    pub fn record_with_retries(
        &self,
        scope: &OsScope,
        signature: &str,
        observation: &Observation,
        max_retries: usize,
    ) -> Result<RecordOutcome, CounterError> {
        let os_key = self.os_key(scope);
        let sig_key = self.signature_key(scope, signature)?;
        let mut retry = Retry::new(max_retries);

        let os_markers = scope.markers();
        let mut sig_markers = os_markers.clone();
        sig_markers.push((FAMILY_SIGNATURE, signature));
        let os_missing = self.missing_markers(&os_key, &os_markers, &mut retry)?;
        let sig_missing = self.missing_markers(&sig_key, &sig_markers, &mut retry)?;

        let mut outcome = RecordOutcome::default();
        for (key, missing) in [(&os_key, &os_missing), (&sig_key, &sig_missing)] {
            for (family, value) in missing {
                retry.run(|| self.store.put(key, family, QUALIFIER_NAME, value.as_bytes()))?;
                outcome.markers_written += 1;
            }
        }

        let mut cells: Vec<(&'static str, String)> = Vec::new();
        let arch = observation.cleaned_arch();
        if !arch.is_empty() {
            cells.push((FAMILY_ARCH, arch));
        }
        for dimension in observation.dimensions() {
            cells.push((dimension.unversioned().family(), dimension.name().to_string()));
            if let Some(family) = dimension.with_version_family() {
                cells.push((family, dimension.qualifier()));
            }
        }

        for (key, total_family) in [(&os_key, FAMILY_OS), (&sig_key, FAMILY_SIGNATURE)] {
            retry.run(|| self.store.increment(key, total_family, QUALIFIER_COUNT, 1))?;
            outcome.increments += 1;
            for (family, qualifier) in &cells {
                retry.run(|| self.store.increment(key, family, qualifier, 1))?;
                outcome.increments += 1;
            }
        }
        outcome.retries = retry.used;

        tracing::debug!(
            scope = %scope,
            signature,
            markers = outcome.markers_written,
            increments = outcome.increments,
            retries = outcome.retries,
            "recorded crash"
        );
        Ok(outcome)
    }

    /// Every cell of the row at `scope_key`, as a point-in-time read.
    pub fn read_scope(&self, scope_key: &[u8]) -> Result<ScopeCounts, CounterError> {
        match self.store.get_row(scope_key)? {
            Some(row) => split_row(row),
            None => Ok(ScopeCounts::default()),
        }
    }

    /// One dimension's count under a scope.
    pub fn read_dimension(&self, scope_key: &[u8], dimension: &Dimension) -> Result<u64, CounterError> {
        Ok(self.read_scope(scope_key)?.dimension_count(dimension))
    }

    pub fn read_os(&self, scope: &OsScope) -> Result<ScopeCounts, CounterError> {
        self.read_scope(&self.os_key(scope))
    }

    pub fn read_signature(&self, scope: &OsScope, signature: &str) -> Result<ScopeCounts, CounterError> {
        self.read_scope(&self.signature_key(scope, signature)?)
    }

    /// All signature scopes recorded under `scope`, in store order.
    ///
    /// Rows are found by prefix (one scan per salt prefix) and then kept only
    /// when their markers name this scope and carry a signature, since an OS
    /// name that is a prefix of another shares the byte prefix.
    pub fn signatures_for_os(&self, scope: &OsScope) -> Result<Vec<SignatureScope>, CounterError> {
        let os_key = self.os_key(scope);
        let prefixes = self
            .codec
            .signature_prefixes(&scope.date, &scope.product, &scope.version, &scope.os);

        let mut found = Vec::new();
        for prefix in &prefixes {
            for item in self.store.scan(prefix, &prefix_end(prefix), &[])? {
                let (key, row) = item?;
                if key == os_key {
                    continue;
                }
                let counts = split_row(row)?;
                if !scope.matches_markers(&counts) {
                    continue;
                }
                if let Some(signature) = counts.signature_name().map(str::to_string) {
                    found.push(SignatureScope { signature, counts });
                }
            }
        }

        tracing::debug!(scope = %scope, prefixes = prefixes.len(), signatures = found.len(), "listed signatures");
        Ok(found)
    }
}

/// Transient-failure budget shared by the store calls of one record.
struct Retry {
    max: usize,
    used: usize,
}

impl Retry {
    fn new(max: usize) -> Self {
        Self { max, used: 0 }
    }

    fn run<T>(&mut self, mut call: impl FnMut() -> Result<T, StoreError>) -> Result<T, StoreError> {
        loop {
            match call() {
                Err(err) if err.is_transient() && self.used < self.max => {
                    self.used += 1;
                    tracing::warn!(retry = self.used, max = self.max, error = %err, "retrying store call");
                }
                result => return result,
            }
        }
    }
}

fn describe_markers(markers: &[(&str, &str)]) -> String {
    markers
        .iter()
        .map(|(family, value)| format!("{family}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Marker values name the same scope when they build the same key part.
fn same_marker(family: &str, stored: &str, wanted: &str) -> bool {
    if family == FAMILY_PRODUCT {
        product_code(stored) == product_code(wanted)
    } else {
        normalize(stored) == normalize(wanted)
    }
}

/// Splits a raw row into counters and markers.
fn split_row(row: Row) -> Result<ScopeCounts, CounterError> {
    let mut counts = ScopeCounts::default();
    for (family, cells) in row {
        for (qualifier, value) in cells {
            if qualifier == QUALIFIER_NAME && MARKER_FAMILIES.contains(&family.as_str()) {
                counts
                    .markers
                    .insert(family.clone(), String::from_utf8_lossy(&value).into_owned());
                continue;
            }
            let count = decode_counter(&value).ok_or_else(|| CounterError::MalformedCounter {
                family: family.clone(),
                qualifier: qualifier.clone(),
                len: value.len(),
            })?;
            counts
                .counters
                .entry(family.clone())
                .or_default()
                .insert(qualifier, count);
        }
    }
    Ok(counts)
}
