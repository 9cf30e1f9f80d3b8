//! Immutable, structurally compared value wrappers.

use serde::Serialize;

/// An immutable wrapper compared by its contained value, not by identity.
///
/// Implementors are newtypes over a primitive or plain data shape whose
/// nested values are themselves primitives or other value objects. The
/// wrapped value is frozen at construction: fields stay private, no
/// mutating accessor exists, and [`value`](ValueObject::value) hands out a
/// shared reference only.
///
/// Two instances of the same concrete type are equal iff their values are
/// deep-structurally equal. Instances of *different* concrete types are
/// never equal -- here that is enforced by the type system, since two
/// newtypes over the same inner value are distinct, incomparable types.
///
/// Serialization: implementors derive `Serialize` with
/// `#[serde(transparent)]`, so a value object's interchange form is its
/// wrapped value's form (not `{"value": ...}`), and
/// serialize → deserialize → wrap reproduces an equal value object.
///
/// Validating subtypes expose a fallible constructor (`try_new`-style)
/// that rejects malformed input before the wrapper exists; construction
/// either fully succeeds or no instance escapes.
///
/// # Examples
///
/// ```
/// use eventroot::ValueObject;
/// use serde::Serialize;
///
/// #[derive(Debug, Clone, PartialEq, Serialize)]
/// struct CurrencyProps {
///     code: String,
///     name: String,
/// }
///
/// #[derive(Debug, Clone, Serialize)]
/// #[serde(transparent)]
/// struct Currency(CurrencyProps);
///
/// impl ValueObject for Currency {
///     type Value = CurrencyProps;
///
///     fn value(&self) -> &CurrencyProps {
///         &self.0
///     }
/// }
///
/// let usd = Currency(CurrencyProps {
///     code: "USD".into(),
///     name: "US Dollar".into(),
/// });
/// let other = Currency(CurrencyProps {
///     code: "USD".into(),
///     name: "US Dollar".into(),
/// });
/// assert!(usd.equals(Some(&other)));
/// assert!(!usd.equals(None));
/// ```
pub trait ValueObject: Serialize {
    /// The wrapped value's type.
    type Value: PartialEq;

    /// Read access to the frozen wrapped value.
    fn value(&self) -> &Self::Value;

    /// Structural equality against another instance of the same concrete
    /// type; `None` compares unequal.
    fn equals(&self, other: Option<&Self>) -> bool {
        other.is_some_and(|other| self.value() == other.value())
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct CurrencyProps {
        code: String,
        name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(transparent)]
    struct Currency(CurrencyProps);

    impl Currency {
        fn new(code: &str, name: &str) -> Self {
            Self(CurrencyProps {
                code: code.to_owned(),
                name: name.to_owned(),
            })
        }
    }

    impl ValueObject for Currency {
        type Value = CurrencyProps;

        fn value(&self) -> &CurrencyProps {
            &self.0
        }
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(transparent)]
    struct Label(String);

    impl ValueObject for Label {
        type Value = String;

        fn value(&self) -> &String {
            &self.0
        }
    }

    #[test]
    fn provides_value_based_on_initial_value() {
        let label = Label("test".to_owned());
        assert_eq!(label.value(), "test");
    }

    #[test]
    fn equals_same_values() {
        let a = Currency::new("USD", "US Dollar");
        let b = Currency::new("USD", "US Dollar");
        assert!(a.equals(Some(&b)));
        assert!(b.equals(Some(&a)), "equality is symmetric");
        assert!(a.equals(Some(&a)), "equality is reflexive");
    }

    #[test]
    fn not_equal_for_different_values() {
        let a = Currency::new("USD", "US Dollar");
        let b = Currency::new("USD2", "US Dollar");
        assert!(!a.equals(Some(&b)));
    }

    #[test]
    fn not_equal_against_absent_value() {
        let a = Currency::new("USD", "US Dollar");
        assert!(!a.equals(None));
    }

    #[test]
    fn mutating_a_clone_of_value_does_not_affect_reads() {
        let usd = Currency::new("USD", "US Dollar");
        let mut copy = usd.value().clone();
        copy.code = "EUR".to_owned();
        assert_eq!(usd.value().code, "USD");
    }

    #[test]
    fn serializes_to_wrapped_value_form() {
        let usd = Currency::new("USD", "US Dollar");
        let json = serde_json::to_value(&usd).expect("serialize should succeed");
        assert_eq!(
            json,
            serde_json::json!({"code": "USD", "name": "US Dollar"}),
            "interchange form is the wrapped value, not {{\"value\": ...}}"
        );
    }

    #[test]
    fn serde_roundtrip_reproduces_an_equal_value_object() {
        let usd = Currency::new("USD", "US Dollar");
        let json = serde_json::to_string(&usd).expect("serialize should succeed");
        let restored: Currency = serde_json::from_str(&json).expect("deserialize should succeed");
        assert!(usd.equals(Some(&restored)));
    }

    // --- validating construction ---

    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(transparent)]
    struct AccountId(String);

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("invalid account id format")]
    struct InvalidAccountId;

    impl AccountId {
        fn try_new(raw: &str) -> Result<Self, InvalidAccountId> {
            uuid::Uuid::parse_str(raw).map_err(|_| InvalidAccountId)?;
            Ok(Self(raw.to_owned()))
        }
    }

    impl ValueObject for AccountId {
        type Value = String;

        fn value(&self) -> &String {
            &self.0
        }
    }

    #[test]
    fn validating_constructor_accepts_well_formed_input() {
        let raw = uuid::Uuid::new_v4().to_string();
        let id = AccountId::try_new(&raw).expect("well-formed id should construct");
        assert_eq!(id.value(), &raw);
    }

    #[test]
    fn validating_constructor_rejects_malformed_input() {
        let result = AccountId::try_new("not-a-uuid");
        assert_eq!(result, Err(InvalidAccountId));
    }
}
