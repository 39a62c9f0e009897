use proc_macro::TokenStream;

mod m_ext_repr;
mod m_packed_data;

/// Implements the `holocron_utils::packed::PackedData` trait on given type.
///
/// There are two paths that this macro takes:
///  * **struct** - All fields must implement `PackedData`. The generated implementation reads and
///    writes struct fields in order of definition.
///  * **enum** - Enums must use `#[parse_as(T)]` alongside this derive macro, which causes the
///    implementation to read/write `T`, and then convert it to `Self`. `T` has to implement
///    `PackedData`, and the `TryFrom<T>` and `From<Self> for T` traits (`ext_repr` provides both).
///
/// *(Note, tuple structs are not supported)*
#[proc_macro_derive(PackedData, attributes(parse_as))]
pub fn packed_data_derive(input: TokenStream) -> TokenStream {
    m_packed_data::packed_data_derive(input)
}

/// Extended `#[repr(T)]` macro. Aside from invoking normal `#[repr(T)]`, it creates:
///  * [`From<Self>`] for `T`, converting into the discriminant
///  * [`TryFrom<T>`] for converting from the discriminant
///  * [`From<Self>`] for `&'static str`, giving the variant's name
///  * [`TryFrom<&str>`] for converting from the variant's name (case-insensitive)
///  * an associated `LAST` constant, holding the last declared variant
///
/// Values rejected by the `TryFrom` implementations produce `holocron_utils::EnumParseError`.
///
/// ## Example
/// ```ignore
/// use holocron_proc::ext_repr;
///
/// #[ext_repr(u32)]
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum LightMode {
///     Unlit = 0,
///     Lit = 1,
///     Diffuse = 2,
///     Gouraud = 3,
/// }
///
/// assert_eq!(LightMode::try_from(2u32), Ok(LightMode::Diffuse));
/// assert_eq!(u32::from(LightMode::Gouraud), 3);
/// assert_eq!(LightMode::try_from("gouraud"), Ok(LightMode::Gouraud));
/// assert_eq!(<&str>::from(LightMode::Lit), "Lit");
/// assert_eq!(LightMode::LAST, LightMode::Gouraud);
/// ```
#[proc_macro_attribute]
pub fn ext_repr(input: TokenStream, source_item: TokenStream) -> TokenStream {
    m_ext_repr::ext_repr(input, source_item)
}
