//! Declarative transform recipes and their interpreter.
//!
//! A [`Recipe`] holds up to eleven kinds of stage. Whatever order they are
//! written in, they always run as:
//!
//! 1. `rename` 2. `select` 3. `trim` 4. `typeCast` 5. `fillna` 6. `dropna`
//! 7. `filter` 8. `cap` 9. `derive` 10. `onehot` 11. `scale.standardize`
//!
//! # Example
//!
//! ```
//! use tabstat::dataset::{Cell, Dataset};
//! use tabstat::pipeline::{self, Recipe};
//!
//! let ds = Dataset::new(
//!     vec!["price".into(), "qty".into()],
//!     vec![vec![Cell::text("2.5"), Cell::text("4")], vec![Cell::Null, Cell::text("1")]],
//! );
//! let recipe = Recipe::from_json(r#"{
//!     "dropna": ["price"],
//!     "derive": [{"new": "total", "expr": "price * qty"}]
//! }"#)?;
//!
//! let out = pipeline::apply(&ds, &recipe);
//! assert_eq!(out.len(), 1);
//! assert_eq!(out.get(0, "total"), Some(&Cell::Number(10.0)));
//! # Ok::<(), tabstat::error::EngineError>(())
//! ```

pub mod executor;
pub mod export;
pub mod expr;
pub mod spec;


pub use executor::{RunReport, apply, run};
pub use export::{CsvExport, to_csv};
pub use spec::{CapMethod, CapRule, CastType, Derivation, Entries, Operator, Predicate, Recipe, ScaleSpec, Stage};
