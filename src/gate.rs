//! Pure decisions: may this caller be forwarded, and where do these digits lead.

use crate::resolve::{AllowedCallers, OptionMap};

/// True when `allowed` is empty, or holds the caller, or holds the called number.
/// An empty caller or called number (missing, or no digits at all) never matches.
///
/// The called-number rule is inherited from the Twimlet this service replaces
/// and is kept for compatibility only. It is not an access control: anyone
/// dialing a number listed in `allowed` gets through.
pub fn is_forwarding_allowed(caller: &str, called: &str, allowed: &AllowedCallers) -> bool {
    let listed = |number: &str| !number.is_empty() && allowed.contains(number);
    allowed.is_empty() || listed(caller) || listed(called)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMatch<'a> {
    /// No digits pressed yet.
    NothingGathered,
    NoMatch,
    Destination(&'a str),
}

pub fn match_option<'a>(digits: &str, options: &'a OptionMap) -> OptionMatch<'a> {
    if digits.is_empty() {
        return OptionMatch::NothingGathered;
    }
    options.get(digits).map_or(OptionMatch::NoMatch, OptionMatch::Destination)
}
