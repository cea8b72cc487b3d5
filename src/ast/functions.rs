//! Function tables: the fixed-name built-ins, aggregates, higher-order
//! array/map functions and CAST targets the compiler knows how to print.

use serde::{Deserialize, Serialize};

macro_rules! scalar_functions {
    ($($variant:ident => $name:literal, $min:literal ..= $max:expr;)*) => {
        /// Built-in scalar functions, called positionally.
        ///
        /// When a call has a receiver (`col.ToUpper()` style), the receiver
        /// becomes the first argument.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum ScalarFn {
            $($variant,)*
        }

        impl ScalarFn {
            /// Name as printed in KSQL.
            pub fn ksql_name(&self) -> &'static str {
                match self {
                    $(ScalarFn::$variant => $name,)*
                }
            }

            /// Accepted argument counts; `None` upper bound means variadic.
            pub fn arity(&self) -> (usize, Option<usize>) {
                match self {
                    $(ScalarFn::$variant => ($min, $max),)*
                }
            }
        }
    };
}

scalar_functions! {
    // numeric
    Abs => "ABS", 1..=Some(1);
    Ceil => "CEIL", 1..=Some(1);
    Floor => "FLOOR", 1..=Some(1);
    Round => "ROUND", 1..=Some(2);
    Sign => "SIGN", 1..=Some(1);
    Sqrt => "SQRT", 1..=Some(1);
    Exp => "EXP", 1..=Some(1);
    Ln => "LN", 1..=Some(1);
    Random => "RANDOM", 0..=Some(0);
    GeoDistance => "GEO_DISTANCE", 4..=Some(5);
    GenerateSeries => "GENERATE_SERIES", 2..=Some(3);
    Greatest => "GREATEST", 1..=None;
    Least => "LEAST", 1..=None;
    // strings
    Concat => "CONCAT", 1..=None;
    ConcatWs => "CONCAT_WS", 2..=None;
    Chr => "CHR", 1..=Some(1);
    Encode => "ENCODE", 3..=Some(3);
    ExtractJsonField => "EXTRACTJSONFIELD", 2..=Some(2);
    Initcap => "INITCAP", 1..=Some(1);
    Instr => "INSTR", 2..=Some(4);
    Lcase => "LCASE", 1..=Some(1);
    Ucase => "UCASE", 1..=Some(1);
    Len => "LEN", 1..=Some(1);
    Lpad => "LPAD", 3..=Some(3);
    Rpad => "RPAD", 3..=Some(3);
    Trim => "TRIM", 1..=Some(1);
    Mask => "MASK", 1..=Some(5);
    MaskKeepLeft => "MASK_KEEP_LEFT", 2..=Some(6);
    MaskKeepRight => "MASK_KEEP_RIGHT", 2..=Some(6);
    MaskLeft => "MASK_LEFT", 2..=Some(6);
    MaskRight => "MASK_RIGHT", 2..=Some(6);
    Replace => "REPLACE", 3..=Some(3);
    RegexpExtract => "REGEXP_EXTRACT", 2..=Some(3);
    RegexpExtractAll => "REGEXP_EXTRACT_ALL", 2..=Some(3);
    RegexpReplace => "REGEXP_REPLACE", 3..=Some(3);
    RegexpSplitToArray => "REGEXP_SPLIT_TO_ARRAY", 2..=Some(2);
    Split => "SPLIT", 2..=Some(2);
    SplitToMap => "SPLIT_TO_MAP", 3..=Some(3);
    Substring => "SUBSTRING", 2..=Some(3);
    ToBytes => "TO_BYTES", 2..=Some(2);
    FromBytes => "FROM_BYTES", 2..=Some(2);
    Uuid => "UUID", 0..=Some(0);
    // collections
    ArrayContains => "ARRAY_CONTAINS", 2..=Some(2);
    ArrayDistinct => "ARRAY_DISTINCT", 1..=Some(1);
    ArrayExcept => "ARRAY_EXCEPT", 2..=Some(2);
    ArrayIntersect => "ARRAY_INTERSECT", 2..=Some(2);
    ArrayJoin => "ARRAY_JOIN", 1..=Some(2);
    ArrayLength => "ARRAY_LENGTH", 1..=Some(1);
    ArrayMax => "ARRAY_MAX", 1..=Some(1);
    ArrayMin => "ARRAY_MIN", 1..=Some(1);
    ArrayRemove => "ARRAY_REMOVE", 2..=Some(2);
    ArraySort => "ARRAY_SORT", 1..=Some(2);
    ArrayUnion => "ARRAY_UNION", 2..=Some(2);
    AsMap => "AS_MAP", 2..=Some(2);
    Entries => "ENTRIES", 2..=Some(2);
    MapKeys => "MAP_KEYS", 1..=Some(1);
    MapValues => "MAP_VALUES", 1..=Some(1);
    MapUnion => "MAP_UNION", 2..=Some(2);
    Explode => "EXPLODE", 1..=Some(1);
    // date and time
    UnixDate => "UNIX_DATE", 0..=Some(1);
    UnixTimestamp => "UNIX_TIMESTAMP", 0..=Some(1);
    StringToDate => "STRINGTODATE", 2..=Some(2);
    StringToTimestamp => "STRINGTOTIMESTAMP", 2..=Some(3);
    TimestampToString => "TIMESTAMPTOSTRING", 2..=Some(3);
    FormatDate => "FORMAT_DATE", 2..=Some(2);
    FormatTime => "FORMAT_TIME", 2..=Some(2);
    FormatTimestamp => "FORMAT_TIMESTAMP", 2..=Some(3);
    ParseDate => "PARSE_DATE", 2..=Some(2);
    ParseTime => "PARSE_TIME", 2..=Some(2);
    ParseTimestamp => "PARSE_TIMESTAMP", 2..=Some(3);
    ConvertTz => "CONVERT_TZ", 3..=Some(3);
    FromUnixTime => "FROM_UNIXTIME", 1..=Some(1);
    // nulls
    Coalesce => "COALESCE", 1..=None;
    IfNull => "IFNULL", 2..=Some(2);
    NullIf => "NULLIF", 2..=Some(2);
    // misc
    AsValue => "AS_VALUE", 1..=Some(1);
}

impl ScalarFn {
    pub fn accepts(&self, count: usize) -> bool {
        let (min, max) = self.arity();
        count >= min && max.is_none_or(|max| count <= max)
    }
}

/// Aggregations over a grouping receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFn {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
    CollectList,
    CollectSet,
    TopK,
    TopKDistinct,
    Histogram,
    EarliestByOffset,
    EarliestByOffsetAllowNulls,
    LatestByOffset,
    LatestByOffsetAllowNulls,
}

impl AggregateFn {
    pub fn ksql_name(&self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::CountDistinct => "COUNT_DISTINCT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
            AggregateFn::CollectList => "COLLECT_LIST",
            AggregateFn::CollectSet => "COLLECT_SET",
            AggregateFn::TopK => "TOPK",
            AggregateFn::TopKDistinct => "TOPKDISTINCT",
            AggregateFn::Histogram => "HISTOGRAM",
            AggregateFn::EarliestByOffset | AggregateFn::EarliestByOffsetAllowNulls => {
                "EARLIEST_BY_OFFSET"
            }
            AggregateFn::LatestByOffset | AggregateFn::LatestByOffsetAllowNulls => {
                "LATEST_BY_OFFSET"
            }
        }
    }

    /// The trailing `ignoreNulls` flag of the by-offset family.
    pub fn ignore_nulls_flag(&self) -> Option<bool> {
        match self {
            AggregateFn::EarliestByOffset | AggregateFn::LatestByOffset => Some(true),
            AggregateFn::EarliestByOffsetAllowNulls | AggregateFn::LatestByOffsetAllowNulls => {
                Some(false)
            }
            _ => None,
        }
    }
}

/// Lambda-taking functions over arrays and maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HigherOrderFn {
    Transform,
    Filter,
    Reduce,
}

impl HigherOrderFn {
    pub fn ksql_name(&self) -> &'static str {
        match self {
            HigherOrderFn::Transform => "TRANSFORM",
            HigherOrderFn::Filter => "FILTER",
            HigherOrderFn::Reduce => "REDUCE",
        }
    }
}

/// Conversion targets for `CAST(expr AS TYPE)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastType {
    Int,
    BigInt,
    Double,
    Boolean,
    String,
    /// Precision and scale come from the call's own literal arguments.
    Decimal,
}

impl CastType {
    pub fn ksql_type(&self) -> &'static str {
        match self {
            CastType::Int => "INT",
            CastType::BigInt => "BIGINT",
            CastType::Double => "DOUBLE",
            CastType::Boolean => "BOOLEAN",
            CastType::String => "VARCHAR",
            CastType::Decimal => "DECIMAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_table() {
        assert!(ScalarFn::Round.accepts(1));
        assert!(ScalarFn::Round.accepts(2));
        assert!(!ScalarFn::Round.accepts(3));
        assert!(ScalarFn::Concat.accepts(7));
        assert!(ScalarFn::Random.accepts(0));
        assert!(!ScalarFn::Random.accepts(1));
    }

    #[test]
    fn test_by_offset_flags() {
        assert_eq!(AggregateFn::LatestByOffset.ignore_nulls_flag(), Some(true));
        assert_eq!(
            AggregateFn::EarliestByOffsetAllowNulls.ignore_nulls_flag(),
            Some(false)
        );
        assert_eq!(AggregateFn::Sum.ignore_nulls_flag(), None);
        assert_eq!(AggregateFn::LatestByOffsetAllowNulls.ksql_name(), "LATEST_BY_OFFSET");
    }
}
