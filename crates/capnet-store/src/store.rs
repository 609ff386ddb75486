// store.rs — CapabilityStore: the process-wide mutable state.
//
// Holds the capability index, the revocation set, and the audit log.
// All mutation of persisted state happens through this type; everything
// above it works on borrowed snapshots for the duration of one
// evaluation. Capabilities are never deleted and revocation is
// monotone: once a cap_id enters the revocation set it stays there.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use capnet_audit::{AuditLog, Receipt};
use capnet_schema::{parse_timestamp, Capability};

use crate::atomic::write_json_atomic;
use crate::error::StoreError;

/// A capability together with its revocation flag, as returned by the
/// list operation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StoredCapability {
    pub capability: Capability,
    pub is_revoked: bool,
}

/// Persistent store for capabilities, revocations, and receipts.
pub struct CapabilityStore {
    data_dir: PathBuf,
    // BTreeMap so iteration order (and therefore lookup tie-breaking)
    // is deterministic across runs.
    caps: BTreeMap<String, Capability>,
    revoked: BTreeSet<String>,
    audit: AuditLog,
}

impl CapabilityStore {
    /// Open the store rooted at `data_dir`, creating it if needed.
    ///
    /// A corrupt capability index or revocation file is logged and
    /// replaced by an empty one, so the core keeps working (and can
    /// issue new capabilities) after damage.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir).map_err(|source| StoreError::Io {
            path: data_dir.display().to_string(),
            source,
        })?;

        let caps = Self::load_or_default::<BTreeMap<String, Capability>>(
            &data_dir.join("capabilities.json"),
            "capability index",
        )?;
        let revoked_list =
            Self::load_or_default::<Vec<String>>(&data_dir.join("revocations.json"), "revocation set")?;
        let audit = AuditLog::open(data_dir.join("audit.jsonl"))?;

        Ok(Self {
            data_dir,
            caps,
            revoked: revoked_list.into_iter().collect(),
            audit,
        })
    }

    fn load_or_default<T: serde::de::DeserializeOwned + Default>(
        path: &Path,
        what: &str,
    ) -> Result<T, StoreError> {
        if !path.exists() {
            return Ok(T::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match serde_json::from_str(&content) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    %err,
                    "corrupt {}; starting from empty",
                    what
                );
                Ok(T::default())
            }
        }
    }

    /// Path of the issuer key file inside this store's directory.
    pub fn issuer_keys_path(&self) -> PathBuf {
        self.data_dir.join("issuer_keys.json")
    }

    /// The directory this store persists into.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // ── Capabilities ─────────────────────────────────────────────

    /// Insert a capability and persist the index atomically.
    pub fn insert_capability(&mut self, cap: Capability) -> Result<(), StoreError> {
        self.caps.insert(cap.cap_id.clone(), cap);
        write_json_atomic(&self.data_dir.join("capabilities.json"), &self.caps)
    }

    /// Look up a capability by id.
    pub fn capability(&self, cap_id: &str) -> Option<&Capability> {
        self.caps.get(cap_id)
    }

    /// Whether the index holds this cap_id.
    pub fn contains(&self, cap_id: &str) -> bool {
        self.caps.contains_key(cap_id)
    }

    /// All capabilities with their revocation flags, in index order.
    pub fn list_capabilities(&self) -> Vec<StoredCapability> {
        self.caps
            .values()
            .map(|cap| StoredCapability {
                capability: cap.clone(),
                is_revoked: self.revoked.contains(&cap.cap_id),
            })
            .collect()
    }

    /// Find the capability an agent should be judged against.
    ///
    /// Filters to exact executor matches (both agent_id and
    /// agent_pubkey), then orders by a composite key, lower first:
    /// unrevoked before revoked, newest issued_at first, earliest
    /// expires_at first, cap_id as the final tiebreak. Revoked
    /// capabilities stay in the candidate set deliberately, so the
    /// pipeline surfaces REVOKED instead of the less informative
    /// NO_CAPABILITY.
    pub fn find_cap_for_agent(&self, agent_id: &str, agent_pubkey: &str) -> Option<Capability> {
        let mut candidates: Vec<&Capability> = self
            .caps
            .values()
            .filter(|cap| {
                cap.executor.agent_id == agent_id && cap.executor.agent_pubkey == agent_pubkey
            })
            .collect();

        candidates.sort_by(|a, b| {
            let key = |cap: &Capability| {
                (
                    self.revoked.contains(&cap.cap_id),
                    std::cmp::Reverse(parse_issued(cap)),
                    parse_expiry(cap),
                )
            };
            key(a).cmp(&key(b)).then_with(|| a.cap_id.cmp(&b.cap_id))
        });

        candidates.first().map(|cap| (*cap).clone())
    }

    // ── Revocations ──────────────────────────────────────────────

    /// Whether a cap_id has been revoked.
    pub fn is_revoked(&self, cap_id: &str) -> bool {
        self.revoked.contains(cap_id)
    }

    /// Add a cap_id to the revocation set and persist atomically.
    pub fn revoke(&mut self, cap_id: &str) -> Result<(), StoreError> {
        self.revoked.insert(cap_id.to_string());
        let as_list: Vec<&String> = self.revoked.iter().collect();
        write_json_atomic(&self.data_dir.join("revocations.json"), &as_list)
    }

    // ── Receipts ─────────────────────────────────────────────────

    /// Append a receipt to the audit log (flushed before returning).
    pub fn append_receipt(&mut self, receipt: &Receipt) -> Result<(), StoreError> {
        self.audit.append(receipt)?;
        Ok(())
    }

    /// Read receipts for the list operation.
    pub fn read_receipts(
        &self,
        limit: Option<usize>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Receipt>, StoreError> {
        Ok(AuditLog::read_recent(self.audit.path(), limit, since)?)
    }
}

fn parse_issued(cap: &Capability) -> DateTime<Utc> {
    // Unparseable issued_at sorts as oldest so damaged records lose ties.
    parse_timestamp(&cap.issued_at).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn parse_expiry(cap: &Capability) -> DateTime<Utc> {
    parse_timestamp(&cap.expires_at).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
