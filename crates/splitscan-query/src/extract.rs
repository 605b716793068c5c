//! Flattening of engine constraints into `(column, operator, value)` triples.

use std::ops::Bound;

use splitscan_core::{Condition, DomainValues, Operator, TupleDomain};

/// Flattens `constraint` into conditions.
///
/// A single-valued domain becomes one `EQ`. Each range of a multi-range
/// domain becomes an `EQ` when it admits one value, otherwise one condition
/// per bounded side. Fully unbounded ranges contribute nothing. Output keeps
/// column order and, within a column, range order.
pub fn extract_conditions(constraint: &TupleDomain) -> Vec<Condition> {
    let Some(domains) = constraint.domains() else {
        return Vec::new();
    };

    let mut conditions = Vec::new();
    for (column, domain) in domains {
        let value_type = domain.column_type;
        match &domain.values {
            DomainValues::Single(value) => {
                conditions.push(Condition::new(
                    column.as_str(),
                    Operator::Eq,
                    value.clone(),
                    value_type,
                ));
            }
            DomainValues::Ranges(ranges) => {
                for range in ranges {
                    if let Some(value) = range.single_value() {
                        conditions.push(Condition::new(
                            column.as_str(),
                            Operator::Eq,
                            value.clone(),
                            value_type,
                        ));
                        continue;
                    }

                    match &range.low {
                        Bound::Included(value) => conditions.push(Condition::new(
                            column.as_str(),
                            Operator::Ge,
                            value.clone(),
                            value_type,
                        )),
                        Bound::Excluded(value) => conditions.push(Condition::new(
                            column.as_str(),
                            Operator::Gt,
                            value.clone(),
                            value_type,
                        )),
                        Bound::Unbounded => {}
                    }

                    match &range.high {
                        Bound::Included(value) => conditions.push(Condition::new(
                            column.as_str(),
                            Operator::Le,
                            value.clone(),
                            value_type,
                        )),
                        Bound::Excluded(value) => conditions.push(Condition::new(
                            column.as_str(),
                            Operator::Lt,
                            value.clone(),
                            value_type,
                        )),
                        Bound::Unbounded => {}
                    }
                }
            }
        }
    }

    tracing::debug!(count = conditions.len(), "extracted conditions from constraint");
    conditions
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitscan_core::{ColumnType, Domain, ScalarValue, ValueRange};

    #[test]
    fn test_unavailable_domains_yield_nothing() {
        assert!(extract_conditions(&TupleDomain::none()).is_empty());
        assert!(extract_conditions(&TupleDomain::all()).is_empty());
    }

    #[test]
    fn test_single_value_and_in_list() {
        let constraint = TupleDomain::all()
            .with_column("city", Domain::single(ColumnType::Varchar, "NY"))
            .with_column("rowkey", Domain::in_values(ColumnType::Varchar, ["a", "b"]));

        let conditions = extract_conditions(&constraint);
        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions[0].to_string(), "city = NY");
        assert!(conditions[1..].iter().all(|c| c.is_eq_on("rowkey")));
    }

    #[test]
    fn test_range_bounds() {
        let constraint = TupleDomain::all().with_column(
            "age",
            Domain::ranges(
                ColumnType::Integer,
                vec![
                    ValueRange::less_than(10),
                    ValueRange::between(20, 30),
                    ValueRange::greater_than(50),
                    ValueRange::all(),
                ],
            ),
        );

        let rendered: Vec<String> = extract_conditions(&constraint)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            rendered,
            vec!["age < 10", "age >= 20", "age <= 30", "age > 50"]
        );
    }

    #[test]
    fn test_high_bound_inclusivity() {
        let constraint = TupleDomain::all().with_column(
            "score",
            Domain::ranges(
                ColumnType::Double,
                vec![ValueRange::at_most(1.5), ValueRange::at_least(9.0)],
            ),
        );
        let conditions = extract_conditions(&constraint);
        assert_eq!(conditions[0].operator, Operator::Le);
        assert_eq!(conditions[0].value, ScalarValue::Double(1.5));
        assert_eq!(conditions[1].operator, Operator::Ge);
        assert!(conditions.iter().all(|c| c.value_type == ColumnType::Double));
    }
}
