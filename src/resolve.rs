//! Input resolution: request parameter, then environment override, then compiled default.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::input::{Environment, ParamValue, Params};

/// API version whose callers get the North-American `1` prefix trimmed.
pub const LEGACY_API_VERSION: &str = "2008-08-01";
const LEGACY_NUMBER_LEN: usize = 11;
const LEGACY_TRUNK_PREFIX: char = '1';

const MENU_OPTION_PREFIX: &str = "FUNLET_MENU_OPTION";
const BULK_OPTION_KEY: &str = "0";
const OPTIONS_PARAM: &str = "Options";

static ENV_OPTION_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^FUNLET_MENU_OPTION([0-9]+)_URL$").expect("static pattern"));
static INDEXED_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Options\[([0-9]+)\]$").expect("static pattern"));

/// First non-empty of request parameter and environment variable, else the default.
pub fn resolve_text(params: &Params, param: &str, env: &Environment, var: &str, default: &str) -> String {
    params
        .non_empty(param)
        .or_else(|| env.non_empty(var))
        .unwrap_or(default)
        .to_string()
}

/// Like [`resolve_text`], but the chosen value must be all digits; anything
/// else yields the default. No partial parsing. Digit strings beyond `u32`
/// saturate at `u32::MAX`.
pub fn resolve_number(params: &Params, param: &str, env: &Environment, var: &str, default: u32) -> u32 {
    params
        .non_empty(param)
        .or_else(|| env.non_empty(var))
        .filter(|raw| raw.bytes().all(|b| b.is_ascii_digit()))
        .map(|raw| raw.parse::<u32>().unwrap_or(u32::MAX))
        .unwrap_or(default)
}

/// Whether the request was sent under the legacy API version.
pub fn is_legacy_api(params: &Params) -> bool {
    params.text("ApiVersion") == Some(LEGACY_API_VERSION)
}

/// Keeps digits only. Under the legacy API version an 11-digit number
/// starting with `1` loses that leading digit. Idempotent.
pub fn normalize_number(raw: &str, legacy_api: bool) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if legacy_api && digits.len() == LEGACY_NUMBER_LEN && digits.starts_with(LEGACY_TRUNK_PREFIX) {
        return digits[1..].to_string();
    }
    digits
}

/// Normalized phone numbers allowed to be forwarded. Empty means everyone is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedCallers(Vec<String>);

impl AllowedCallers {
    /// Merges, in order: the `AllowedCallers` parameter (single or list), the
    /// numbered environment overrides, then the compiled defaults.
    pub fn resolve(params: &Params, env: &Environment, env_vars: &[&str], defaults: &[String]) -> Self {
        let legacy_api = is_legacy_api(params);
        let mut callers = AllowedCallers::default();

        match params.get("AllowedCallers") {
            Some(ParamValue::Text(number)) => callers.push(number, legacy_api),
            Some(ParamValue::List(numbers)) => {
                for number in numbers {
                    callers.push(number, legacy_api);
                }
            }
            Some(ParamValue::Map(_)) | None => {}
        }
        for var in env_vars {
            if let Some(number) = env.get(var) {
                callers.push(number, legacy_api);
            }
        }
        for number in defaults {
            callers.push(number, legacy_api);
        }
        callers
    }

    /// Entries without a single digit can never name a caller and are dropped.
    fn push(&mut self, raw: &str, legacy_api: bool) {
        let number = normalize_number(raw, legacy_api);
        if !number.is_empty() {
            self.0.push(number);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, number: &str) -> bool {
        self.0.iter().any(|allowed| allowed == number)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for AllowedCallers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Menu options: digits pressed -> destination URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionMap(BTreeMap<String, String>);

impl OptionMap {
    /// Later sources overwrite earlier ones on the same digits: compiled
    /// defaults, numbered environment options, the bulk `Options` parameter,
    /// then `Options[<n>]` parameters.
    pub fn resolve(params: &Params, env: &Environment, defaults: &BTreeMap<String, String>) -> Self {
        let mut options = defaults.clone();

        for (name, url) in env.iter() {
            let Some(captures) = ENV_OPTION_URL.captures(name) else {
                continue;
            };
            let index = &captures[1];
            let digits_var = format!("{MENU_OPTION_PREFIX}{index}_DIGITS");
            let digits = env.non_empty(&digits_var).unwrap_or(index);
            options.insert(digits.to_string(), url.to_string());
        }

        match params.get(OPTIONS_PARAM) {
            Some(ParamValue::Text(url)) => {
                options.insert(BULK_OPTION_KEY.to_string(), url.clone());
            }
            Some(ParamValue::List(urls)) => {
                let mut index = itoa::Buffer::new();
                for (position, url) in urls.iter().enumerate() {
                    options.insert(index.format(position).to_string(), url.clone());
                }
            }
            Some(ParamValue::Map(entries)) => {
                options.extend(entries.iter().map(|(digits, url)| (digits.clone(), url.clone())));
            }
            None => {}
        }

        for (name, value) in params.iter() {
            let (Some(captures), Some(url)) = (INDEXED_OPTION.captures(name), value.as_text()) else {
                continue;
            };
            options.insert(captures[1].to_string(), url.to_string());
        }

        Self(options)
    }

    pub fn get(&self, digits: &str) -> Option<&str> {
        self.0.get(digits).map(String::as_str)
    }

    /// Longest digits key, and at least 1.
    pub fn max_digits(&self) -> usize {
        self.0.keys().map(String::len).fold(1, usize::max)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs.iter().copied().collect()
    }

    #[test]
    fn request_beats_environment_beats_default() {
        let environment = env(&[("FUNLET_FORWARD_VOICE", "man")]);
        let resolve = |params: &Params| resolve_text(params, "Voice", &environment, "FUNLET_FORWARD_VOICE", "alice");

        assert_eq!(resolve(&Params::new().with("Voice", "woman")), "woman");
        assert_eq!(resolve(&Params::new().with("Voice", "")), "man");
        assert_eq!(resolve(&Params::new()), "man");
        assert_eq!(
            resolve_text(&Params::new(), "Voice", &Environment::default(), "FUNLET_FORWARD_VOICE", "alice"),
            "alice"
        );
    }

    #[test]
    fn empty_environment_value_is_absent() {
        let environment = env(&[("FUNLET_MENU_MESSAGE", "")]);
        assert_eq!(
            resolve_text(&Params::new(), "Message", &environment, "FUNLET_MENU_MESSAGE", "hello"),
            "hello"
        );
    }

    #[test]
    fn non_numeric_timeout_falls_back_to_default() {
        let environment = env(&[("FUNLET_FORWARD_TIMEOUT", "30")]);
        let timeout = |params: &Params, environment: &Environment| {
            resolve_number(params, "Timeout", environment, "FUNLET_FORWARD_TIMEOUT", 20)
        };

        assert_eq!(timeout(&Params::new().with("Timeout", "abc"), &Environment::default()), 20);
        assert_eq!(timeout(&Params::new().with("Timeout", "12abc"), &environment), 20);
        assert_eq!(timeout(&Params::new().with("Timeout", "45"), &environment), 45);
        assert_eq!(timeout(&Params::new(), &environment), 30);
        assert_eq!(timeout(&Params::new(), &env(&[("FUNLET_FORWARD_TIMEOUT", "-5")])), 20);
    }

    #[test]
    fn oversized_timeout_saturates() {
        let params = Params::new().with("Timeout", "99999999999");
        assert_eq!(
            resolve_number(&params, "Timeout", &Environment::default(), "FUNLET_FORWARD_TIMEOUT", 20),
            u32::MAX
        );
    }

    #[test]
    fn digitless_allowed_entries_are_dropped() {
        let mut params = Params::new();
        params.insert("AllowedCallers", ParamValue::List(vec!["client:alice".into(), "+1 555 0100".into()]));
        let callers = AllowedCallers::resolve(&params, &Environment::default(), &[], &["anonymous".to_string()]);
        assert_eq!(callers.as_slice(), ["15550100"]);
    }

    #[test]
    fn legacy_api_trims_north_american_prefix() {
        assert_eq!(normalize_number("+1 (415) 555-0100", true), "4155550100");
        assert_eq!(normalize_number("+1 (415) 555-0100", false), "14155550100");
        assert_eq!(normalize_number("+44 20 7946 0958", true), "442079460958");
        assert_eq!(normalize_number("24155550100", true), "24155550100");
    }

    #[test]
    fn allowed_callers_merge_in_source_order() {
        let mut params = Params::new().with("ApiVersion", LEGACY_API_VERSION);
        params.insert(
            "AllowedCallers",
            ParamValue::List(vec!["+1 415 555 0100".into(), "".into(), "5551234".into()]),
        );
        let environment = env(&[
            ("FUNLET_FORWARD_ALLOWED_CALLER1", "555-0001"),
            ("FUNLET_FORWARD_ALLOWED_CALLER3", ""),
            ("FUNLET_FORWARD_ALLOWED_CALLER5", "555-0005"),
        ]);
        let vars = [
            "FUNLET_FORWARD_ALLOWED_CALLER1",
            "FUNLET_FORWARD_ALLOWED_CALLER2",
            "FUNLET_FORWARD_ALLOWED_CALLER3",
            "FUNLET_FORWARD_ALLOWED_CALLER4",
            "FUNLET_FORWARD_ALLOWED_CALLER5",
        ];

        let callers = AllowedCallers::resolve(&params, &environment, &vars, &["(555) 999".to_string()]);

        assert_eq!(
            callers.as_slice(),
            ["4155550100", "5551234", "5550001", "5550005", "555999"]
        );
    }

    #[test]
    fn single_allowed_caller_parameter() {
        let params = Params::new().with("AllowedCallers", "+14155550100");
        let callers = AllowedCallers::resolve(&params, &Environment::default(), &[], &[]);
        assert_eq!(callers.as_slice(), ["14155550100"]);
    }

    #[test]
    fn option_sources_overwrite_in_order() {
        let defaults = BTreeMap::from([("1".to_string(), "A".to_string())]);
        let environment = env(&[("FUNLET_MENU_OPTION2_URL", "B")]);
        let mut params = Params::new().with("Options[3]", "D");
        params.insert("Options", ParamValue::Map(BTreeMap::from([("1".into(), "C".into())])));

        let options = OptionMap::resolve(&params, &environment, &defaults);

        assert_eq!(options, OptionMap::from_iter([("1", "C"), ("2", "B"), ("3", "D")]));
    }

    #[test]
    fn environment_option_digits_override_index() {
        let environment = env(&[
            ("FUNLET_MENU_OPTION1_URL", "https://sales"),
            ("FUNLET_MENU_OPTION1_DIGITS", "42"),
            ("FUNLET_MENU_OPTION2_URL", "https://support"),
            ("FUNLET_MENU_OPTION2_DIGITS", ""),
            ("FUNLET_MENU_OPTIONX_URL", "https://ignored"),
        ]);

        let options = OptionMap::resolve(&Params::new(), &environment, &BTreeMap::new());

        assert_eq!(options, OptionMap::from_iter([("42", "https://sales"), ("2", "https://support")]));
        assert_eq!(options.max_digits(), 2);
    }

    #[test]
    fn bulk_option_text_and_list() {
        let options = OptionMap::resolve(&Params::new().with("Options", "https://only"), &Environment::default(), &BTreeMap::new());
        assert_eq!(options.get("0"), Some("https://only"));

        let mut params = Params::new();
        params.insert("Options", ParamValue::List(vec!["https://zero".into(), "https://one".into()]));
        let options = OptionMap::resolve(&params, &Environment::default(), &BTreeMap::new());
        assert_eq!(options, OptionMap::from_iter([("0", "https://zero"), ("1", "https://one")]));
    }

    #[test]
    fn max_digits_is_at_least_one() {
        assert_eq!(OptionMap::default().max_digits(), 1);
        assert_eq!(OptionMap::from_iter([("123", "x"), ("4", "y")]).max_digits(), 3);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[-+() 0-9a-z]{0,20}", legacy in any::<bool>()) {
            let once = normalize_number(&raw, legacy);
            prop_assert_eq!(normalize_number(&once, legacy), once.clone());
            prop_assert!(once.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
