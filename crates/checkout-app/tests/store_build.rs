use checkout_store::{build_store, Store};
use checkout_types::ports::catalog_store::CatalogStore;
use std::env;

#[tokio::test]
async fn builds_sqlite_store_from_env() {
    // Use a temp DB path for isolation.
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("checkout-test.db");
    let url = format!("sqlite://{}", db_path.display());
    env::set_var("DATABASE_URL", &url);

    let store: Store = build_store(Some(&url)).await.expect("build store");
    // basic sanity: listing the catalog should succeed and be empty
    let products = store.list_products().await.expect("list products");
    assert!(products.is_empty());
}
