use crate::config::{InputSpec, WordLists};
use rand::seq::SliceRandom;
use rand::RngCore;
use std::fmt;

/// Outcome of resolving one input's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The input's fixed `value`
    Fixed(String),
    /// Drawn from the input's own `random_values`
    RandomChoice(String),
    /// Drawn from a shared word list
    ListChoice { list: String, value: String },
    /// No source configured
    NoValue,
    /// `value_list` names a word list that does not exist
    MissingList(String),
    /// `value_list` names an empty word list
    EmptyList(String),
}

impl Resolution {
    /// The value to type, if one was produced
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Fixed(v) | Self::RandomChoice(v) | Self::ListChoice { value: v, .. } => Some(v),
            Self::NoValue | Self::MissingList(_) | Self::EmptyList(_) => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => write!(f, "fixed value '{}'", v),
            Self::RandomChoice(v) => write!(f, "random value '{}'", v),
            Self::ListChoice { list, value } => write!(f, "'{}' from list '{}'", value, list),
            Self::NoValue => write!(f, "no value configured"),
            Self::MissingList(list) => write!(f, "word list '{}' not found", list),
            Self::EmptyList(list) => write!(f, "word list '{}' is empty", list),
        }
    }
}

/// One value source; None passes the input on to the next source
type Strategy = fn(&InputSpec, &WordLists, &mut dyn RngCore) -> Option<Resolution>;

/// Value sources in priority order
const STRATEGIES: [Strategy; 3] = [fixed_value, random_value, list_value];

fn fixed_value(spec: &InputSpec, _: &WordLists, _: &mut dyn RngCore) -> Option<Resolution> {
    spec.value.clone().map(Resolution::Fixed)
}

fn random_value(spec: &InputSpec, _: &WordLists, rng: &mut dyn RngCore) -> Option<Resolution> {
    spec.random_values
        .as_deref()?
        .choose(rng)
        .cloned()
        .map(Resolution::RandomChoice)
}

fn list_value(spec: &InputSpec, word_lists: &WordLists, rng: &mut dyn RngCore) -> Option<Resolution> {
    let name = spec.value_list.as_ref()?;
    let resolution = match word_lists.get(name) {
        None => Resolution::MissingList(name.clone()),
        Some(list) => match list.choose(rng) {
            Some(value) => Resolution::ListChoice {
                list: name.clone(),
                value: value.clone(),
            },
            None => Resolution::EmptyList(name.clone()),
        },
    };
    Some(resolution)
}

/// Resolves input values against the walk's word lists
///
/// Sources are tried in order and the first one that applies wins:
/// 1. `value`, returned verbatim (empty string included)
/// 2. `random_values`, one element drawn uniformly when non-empty
/// 3. `value_list`, one element of the named word list drawn uniformly
///
/// Resolution never fails. A missing or empty word list yields a
/// [`Resolution`] without a value.
#[derive(Debug, Clone, Copy)]
pub struct ValueResolver<'a> {
    word_lists: &'a WordLists,
}

impl<'a> ValueResolver<'a> {
    pub fn new(word_lists: &'a WordLists) -> Self {
        Self { word_lists }
    }

    pub fn resolve(&self, spec: &InputSpec, rng: &mut dyn RngCore) -> Resolution {
        STRATEGIES
            .iter()
            .find_map(|strategy| strategy(spec, self.word_lists, &mut *rng))
            .unwrap_or(Resolution::NoValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn word_lists() -> WordLists {
        let mut lists = WordLists::new();
        lists.insert(
            "colors".to_string(),
            vec!["red".to_string(), "green".to_string(), "blue".to_string()],
        );
        lists.insert("empty".to_string(), Vec::new());
        lists
    }

    fn strings(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_fixed_value_wins() {
        let lists = word_lists();
        let resolver = ValueResolver::new(&lists);
        let mut rng = StdRng::seed_from_u64(1);
        let spec = InputSpec {
            value: Some("fixed".to_string()),
            random_values: strings(&["a", "b"]),
            value_list: Some("colors".to_string()),
            ..Default::default()
        };

        for _ in 0..20 {
            assert_eq!(
                resolver.resolve(&spec, &mut rng),
                Resolution::Fixed("fixed".to_string())
            );
        }
    }

    #[test]
    fn test_empty_fixed_value_is_a_value() {
        let lists = word_lists();
        let spec = InputSpec {
            value: Some(String::new()),
            random_values: strings(&["a"]),
            ..Default::default()
        };
        let resolution = ValueResolver::new(&lists).resolve(&spec, &mut StdRng::seed_from_u64(1));
        assert_eq!(resolution.value(), Some(""));
    }

    #[test]
    fn test_random_values_before_list() {
        let lists = word_lists();
        let spec = InputSpec {
            random_values: strings(&["a", "b"]),
            value_list: Some("colors".to_string()),
            ..Default::default()
        };
        let resolution = ValueResolver::new(&lists).resolve(&spec, &mut StdRng::seed_from_u64(3));
        assert!(matches!(resolution, Resolution::RandomChoice(ref v) if v == "a" || v == "b"));
    }

    #[test]
    fn test_empty_random_values_fall_through_to_list() {
        let lists = word_lists();
        let spec = InputSpec {
            random_values: Some(Vec::new()),
            value_list: Some("colors".to_string()),
            ..Default::default()
        };
        let resolution = ValueResolver::new(&lists).resolve(&spec, &mut StdRng::seed_from_u64(3));
        assert!(matches!(resolution, Resolution::ListChoice { ref list, .. } if list == "colors"));
    }

    #[test]
    fn test_missing_and_empty_lists_give_no_value() {
        let lists = word_lists();
        let resolver = ValueResolver::new(&lists);
        let mut rng = StdRng::seed_from_u64(5);

        let missing = InputSpec {
            value_list: Some("nope".to_string()),
            ..Default::default()
        };
        let empty = InputSpec {
            value_list: Some("empty".to_string()),
            ..Default::default()
        };

        let resolution = resolver.resolve(&missing, &mut rng);
        assert_eq!(resolution, Resolution::MissingList("nope".to_string()));
        assert_eq!(resolution.value(), None);

        let resolution = resolver.resolve(&empty, &mut rng);
        assert_eq!(resolution, Resolution::EmptyList("empty".to_string()));
        assert_eq!(resolution.value(), None);
    }

    #[test]
    fn test_no_source_gives_no_value() {
        let lists = WordLists::new();
        let resolution =
            ValueResolver::new(&lists).resolve(&InputSpec::default(), &mut StdRng::seed_from_u64(0));
        assert_eq!(resolution, Resolution::NoValue);
    }

    #[test]
    fn test_list_choice_is_roughly_uniform() {
        let lists = word_lists();
        let resolver = ValueResolver::new(&lists);
        let mut rng = StdRng::seed_from_u64(42);
        let spec = InputSpec {
            value_list: Some("colors".to_string()),
            ..Default::default()
        };

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..3000 {
            let value = resolver.resolve(&spec, &mut rng).value().map(str::to_string);
            *counts.entry(value.unwrap()).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for color in ["red", "green", "blue"] {
            let n = counts[color];
            assert!((850..=1150).contains(&n), "{} drawn {} times", color, n);
        }
    }

    #[test]
    fn test_random_values_stay_in_set() {
        let lists = WordLists::new();
        let resolver = ValueResolver::new(&lists);
        let mut rng = StdRng::seed_from_u64(7);
        let spec = InputSpec {
            random_values: strings(&["x", "y", "z", "w"]),
            ..Default::default()
        };

        let mut seen = std::collections::HashSet::new();
        for _ in 0..400 {
            let value = resolver.resolve(&spec, &mut rng).value().unwrap().to_string();
            assert!(["x", "y", "z", "w"].contains(&value.as_str()));
            seen.insert(value);
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_same_seed_same_values() {
        let lists = word_lists();
        let resolver = ValueResolver::new(&lists);
        let spec = InputSpec {
            value_list: Some("colors".to_string()),
            ..Default::default()
        };

        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| resolver.resolve(&spec, &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(9), draw(9));
    }
}
