use domains::CategoryRepository;
use integration_tests::Board;
use services::{CategorySeeder, CATEGORY_NAMES};

#[tokio::test]
async fn seeding_loads_the_taxonomy() {
    let board = Board::new();
    let ids = CategorySeeder::new(board.store.clone()).seed().await.unwrap();
    assert_eq!(ids.len(), CATEGORY_NAMES.len());

    let mut names: Vec<String> = board
        .store
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    names.sort();
    let mut expected: Vec<String> = CATEGORY_NAMES.iter().map(|n| n.to_string()).collect();
    expected.sort();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn seeding_twice_duplicates_categories() {
    let board = Board::new();
    let seeder = CategorySeeder::new(board.store.clone());
    seeder.seed().await.unwrap();
    seeder.seed().await.unwrap();

    let categories = CategoryRepository::find_all(board.store.as_ref()).await.unwrap();
    assert_eq!(categories.len(), 2 * CATEGORY_NAMES.len());
}
