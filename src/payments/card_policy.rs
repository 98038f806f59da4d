//! Which cards may be stored as tokens

use crate::payments::types::CvcRequired;

/// A card is stored when later charges need no CVC, or when the merchant
/// accepts cards that do.
pub fn should_store_card(cvc_required: CvcRequired, accept_cvc_required: bool) -> bool {
    cvc_required == CvcRequired::No || accept_cvc_required
}
