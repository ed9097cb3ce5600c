#[macro_export]
macro_rules! tml {
    // Handle null
    (null) => {
        $crate::Value::null()
    };

    // Handle true
    (true) => {
        $crate::Value::bool(true)
    };

    // Handle false
    (false) => {
        $crate::Value::bool(false)
    };

    // Handle empty array
    ([]) => {
        $crate::Value::array(vec![])
    };

    // Handle non-empty array
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::array(vec![$($crate::tml!($elem)),*])
    };

    // Handle empty object
    ({}) => {
        $crate::Value::object(vec![])
    };

    // Handle non-empty object; keys map to unquoted text names
    ({ $($key:literal => $value:tt),* $(,)? }) => {{
        let mut pairs = Vec::new();
        $(
            pairs.push($crate::Pair::new($crate::Value::text($key), $crate::tml!($value)));
        )*
        $crate::Value::object(pairs)
    }};

    // Fallback for any expression with a From conversion
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

#[cfg(test)]
mod tests {
    use crate::{Value, ValueKind};

    #[test]
    fn test_tml_macro_primitives() {
        assert_eq!(tml!(null), Value::null());
        assert_eq!(tml!(true), Value::bool(true));
        assert_eq!(tml!(false), Value::bool(false));
        assert_eq!(tml!(42), Value::int(42));
        assert_eq!(tml!(3.5), Value::float(3.5));
        assert_eq!(tml!("hello"), Value::text("hello"));
    }

    #[test]
    fn test_tml_macro_arrays() {
        assert_eq!(tml!([]), Value::array(vec![]));

        let arr = tml!([1, 2, 3]);
        match arr.kind {
            ValueKind::Array(values) => {
                assert_eq!(values.len(), 3);
                assert_eq!(values[0], Value::int(1));
                assert_eq!(values[2], Value::int(3));
            }
            _ => panic!("Expected array"),
        }
    }

    #[test]
    fn test_tml_macro_objects() {
        assert_eq!(tml!({}), Value::object(vec![]));

        let obj = tml!({
            "name" => "Alice",
            "age" => 30,
            "tags" => ["rust", "tml"],
        });
        assert_eq!(obj.object_get_text("name"), Some("Alice"));
        assert_eq!(obj.object_get_int("age"), Some(30));
        assert_eq!(
            obj.object_get_value("tags").unwrap().as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn test_tml_macro_nested() {
        let obj = tml!({
            "window" => {
                "width" => 800,
                "height" => 600,
            },
        });
        let window = obj.object_get_value("window").unwrap();
        assert_eq!(window.object_get_int("height"), Some(600));
    }
}
