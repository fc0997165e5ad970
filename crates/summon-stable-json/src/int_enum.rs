/// Implemented by enums that persist as their integer discriminant rather
/// than their variant name (spec.md §6: "enums as their integer value").
/// Paired with [`crate::int_enum_serde`] to wire up `Serialize`/
/// `Deserialize` without hand-writing the match arms at every call site.
pub trait IntEnum: Sized {
    fn to_i64(&self) -> i64;
    fn from_i64(value: i64) -> Option<Self>;
}

/// Emits `Serialize`/`Deserialize` impls for a type that already implements
/// [`IntEnum`], round-tripping through its integer discriminant.
#[macro_export]
macro_rules! int_enum_serde {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_i64($crate::IntEnum::to_i64(self))
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = i64::deserialize(deserializer)?;
                <$ty as $crate::IntEnum>::from_i64(value).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "{} is not a valid {}",
                        value,
                        stringify!($ty)
                    ))
                })
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Priority {
        Low,
        Normal,
        High,
    }

    impl IntEnum for Priority {
        fn to_i64(&self) -> i64 {
            match self {
                Priority::Low => 0,
                Priority::Normal => 1,
                Priority::High => 2,
            }
        }

        fn from_i64(value: i64) -> Option<Self> {
            match value {
                0 => Some(Priority::Low),
                1 => Some(Priority::Normal),
                2 => Some(Priority::High),
                _ => None,
            }
        }
    }

    crate::int_enum_serde!(Priority);

    #[test]
    fn round_trips_as_integer() {
        let text = crate::to_string(&Priority::High).unwrap();
        assert_eq!(text.trim(), "2");
        let back: Priority = crate::from_str(&text).unwrap();
        assert_eq!(back, Priority::High);
    }
}
