pub mod error;
pub mod value;

pub use error::{
    ControllerError, DriverError, FieldError, Operation, Result, SchemaError, ValidationTarget,
};
pub use value::{FieldMap, StringMap, Value, field_map, string_map};
