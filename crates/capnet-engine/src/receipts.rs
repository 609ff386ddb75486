// receipts.rs — Signed receipt emission.
//
// Every receipt the core writes is signed with the issuer key under the
// receipt domain and flushed to the audit log before the operation that
// produced it returns.

use capnet_audit::{sign_receipt, Receipt};
use capnet_store::{CapabilityStore, IssuerKeys};

use crate::error::CoreFault;

/// Sign `receipt` and append it to the store's audit log. Returns the
/// receipt as written (proof attached) so callers can hand its id back.
pub(crate) fn emit(
    store: &mut CapabilityStore,
    keys: &IssuerKeys,
    mut receipt: Receipt,
) -> Result<Receipt, CoreFault> {
    sign_receipt(&mut receipt, keys.signing_key())
        .map_err(|e| CoreFault::Signing(e.to_string()))?;
    store.append_receipt(&receipt).map_err(CoreFault::Store)?;
    Ok(receipt)
}
