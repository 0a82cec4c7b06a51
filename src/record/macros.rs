/// Declares a record struct and implements [`Record`](crate::record::Record) for it.
///
/// The first field must be the `i64` identity, marked `#[identity]`. Every
/// other field is a data field whose type implements
/// [`FieldType`](crate::record::FieldType). A data field may name its column
/// with `as "column"` and list validation rules in brackets; rule names are
/// the [`FieldRules`](crate::record::FieldRules) builder methods.
///
/// ```
/// use struct2db::record;
///
/// record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Group table = "groups" {
///         #[identity]
///         pub id: i64,
///         pub name: String [required, len_max = 64],
///     }
///     relations {
///         persons => group_id,
///     }
/// }
///
/// record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Person {
///         #[identity]
///         pub id: i64,
///         pub name: String as "full_name" [required],
///         pub age: i32 [min = 0, max = 150],
///         pub group_id: i64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(table = $table:literal)? {
            #[identity]
            $id_vis:vis $id:ident : i64,
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty
                $(as $column:literal)?
                $([ $($rule:ident $(= $arg:expr)?),* $(,)? ])?
            ),* $(,)?
        }
        $(relations { $($relation:ident => $foreign:ident),* $(,)? })?
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $id_vis $id: i64,
            $(
                $(#[$field_meta])*
                $field_vis $field: $field_ty,
            )*
        }

        impl $crate::record::Record for $name {
            fn type_name(&self) -> &'static str {
                stringify!($name)
            }

            fn table_name(&self) -> ::std::option::Option<&'static str> {
                $crate::__record_table!($($table)?)
            }

            fn identity_field(&self) -> &'static str {
                stringify!($id)
            }

            fn fields(&self) -> ::std::vec::Vec<$crate::record::FieldDef> {
                ::std::vec![
                    $(
                        $crate::record::FieldDef::new(
                            stringify!($field),
                            <$field_ty as $crate::record::FieldType>::KIND,
                        )
                        $(.column($column))?
                        .rules(
                            $crate::record::FieldRules::new()
                            $($(.$rule($($arg)?))*)?
                        )
                    ),*
                ]
            }

            fn relations(&self) -> ::std::vec::Vec<$crate::record::Relation> {
                ::std::vec![
                    $($(
                        $crate::record::Relation::new(stringify!($relation), stringify!($foreign))
                    ),*)?
                ]
            }

            fn identity(&self) -> i64 {
                self.$id
            }

            fn set_identity(&mut self, id: i64) {
                self.$id = id;
            }

            fn field_value(&self, name: &str) -> ::std::option::Option<$crate::Value> {
                match name {
                    $(
                        stringify!($field) => ::std::option::Option::Some(
                            <$field_ty as $crate::record::FieldType>::to_value(&self.$field),
                        ),
                    )*
                    _ => ::std::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                name: &str,
                value: $crate::Value,
            ) -> ::std::result::Result<(), $crate::FieldError> {
                match name {
                    $(
                        stringify!($field) => {
                            self.$field =
                                <$field_ty as $crate::record::FieldType>::from_value(name, value)?;
                            ::std::result::Result::Ok(())
                        }
                    )*
                    _ => ::std::result::Result::Err($crate::FieldError::UnknownField(
                        name.to_string(),
                    )),
                }
            }

            fn reset(&mut self) {
                self.$id = 0;
                $(
                    self.$field = <$field_ty as $crate::record::FieldType>::zero();
                )*
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_table {
    () => {
        ::std::option::Option::None
    };
    ($table:literal) => {
        ::std::option::Option::Some($table)
    };
}
