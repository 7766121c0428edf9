pub mod card;
pub mod ground;
pub mod pickup;
pub mod tax;
pub mod wallet;

pub use card::DummyCardProvider;
pub use ground::DummyGroundProvider;
pub use pickup::DummyPickupProvider;
pub use tax::FlatRateTax;
pub use wallet::DummyWalletProvider;

/// Strips everything but ASCII digits, so card numbers may be entered
/// with spaces or dashes.
pub(crate) fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_only_drops_separators() {
        assert_eq!(digits_only("4242 4242-4242 4242"), "4242424242424242");
        assert_eq!(digits_only("abc"), "");
    }
}
