use serde_json::Value;
use uuid::Uuid;

/// A single filter condition evaluated against one document field.
#[derive(Debug, Clone)]
pub enum Clause {
    /// Whole-field string match, case-insensitive.
    FieldEq(&'static str, String),
    /// Exact string match (enum values, codes).
    FieldIs(&'static str, String),
    /// Case-insensitive substring match.
    FieldContains(&'static str, String),
    /// Identifier equality.
    IdEq(&'static str, Uuid),
    /// Identifier inequality (used to exclude the record under update).
    IdNe(&'static str, Uuid),
    /// Identifier membership.
    IdIn(&'static str, Vec<Uuid>),
    /// Numeric lower bound, inclusive.
    NumGte(&'static str, f64),
    /// Numeric upper bound, inclusive.
    NumLte(&'static str, f64),
    /// Disjunction of clauses.
    AnyOf(Vec<Clause>),
}

impl Clause {
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::FieldEq(field, want) => {
                str_field(doc, field).is_some_and(|s| s.eq_ignore_ascii_case(want))
            }
            Self::FieldIs(field, want) => str_field(doc, field).is_some_and(|s| s == want),
            Self::FieldContains(field, want) => str_field(doc, field)
                .is_some_and(|s| s.to_lowercase().contains(&want.to_lowercase())),
            Self::IdEq(field, want) => id_field(doc, field).is_some_and(|id| id == *want),
            Self::IdNe(field, want) => id_field(doc, field).is_some_and(|id| id != *want),
            Self::IdIn(field, wanted) => {
                id_field(doc, field).is_some_and(|id| wanted.contains(&id))
            }
            Self::NumGte(field, bound) => num_field(doc, field).is_some_and(|n| n >= *bound),
            Self::NumLte(field, bound) => num_field(doc, field).is_some_and(|n| n <= *bound),
            Self::AnyOf(clauses) => clauses.iter().any(|c| c.matches(doc)),
        }
    }
}

/// A conjunction of clauses. The empty predicate matches every document.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|c| c.matches(doc))
    }

    /// Filter on a record id.
    pub fn by_id(id: Uuid) -> Self {
        Self::new().with(Clause::IdEq("id", id))
    }
}

fn str_field<'a>(doc: &'a Value, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

fn id_field(doc: &Value, field: &str) -> Option<Uuid> {
    str_field(doc, field).and_then(|s| Uuid::parse_str(s).ok())
}

fn num_field(doc: &Value, field: &str) -> Option<f64> {
    doc.get(field).and_then(Value::as_f64)
}
