extern crate proc_macro;
extern crate quote;
extern crate syn;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Derives the `SerializableDynamics` trait and a `from_value` constructor,
/// so the dynamics type can be registered with the model factory and built
/// from the value map of its merged experiment conditions.
#[proc_macro_derive(SerializableDynamics)]
pub fn dynamics(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let name = input.ident;
    let tokens = quote! {
        impl #name {
            pub fn from_value(value: serde_yaml::Value) -> Option<Box<dyn ReportableDynamics>> {
                match serde_yaml::from_value::<Self>(value) {
                    Ok(dynamics) => Some(Box::new(dynamics)),
                    Err(_) => None
                }
            }
        }
        impl SerializableDynamics for #name {
            fn get_type(&self) -> &'static str {
                stringify!(#name)
            }
            fn serialize(&self) -> serde_yaml::Value {
                serde_yaml::to_value(self).unwrap_or(serde_yaml::Value::Null)
            }
        }
    };
    tokens.into()
}
