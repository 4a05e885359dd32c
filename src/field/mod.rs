pub mod cube;
pub mod header;
pub mod input;
pub mod io;
pub mod map;
pub mod traits;

pub use self::cube::Cube;
pub use self::header::{AxisKind, FieldHeader};
pub use self::input::{Field, FieldData, FieldInput};
pub use self::map::Map2;
pub use self::traits::{FieldView, Rows};
