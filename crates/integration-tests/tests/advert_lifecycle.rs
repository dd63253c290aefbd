//! Creating, editing and deleting adverts through the service layer.

use chrono::Utc;
use domains::{AdvertId, AppError, Field, FieldError, Identity, Role};
use integration_tests::{admin, author, submission, Board};
use services::CategorySeeder;

fn field_errors(error: AppError) -> Vec<FieldError> {
    match error {
        AppError::Validation(errors) => errors,
        other => panic!("expected validation errors, got {other:?}"),
    }
}

fn has_error_on(errors: &[FieldError], field: Field) -> bool {
    errors.iter().any(|e| e.field == field)
}

#[tokio::test]
async fn nine_character_title_is_rejected() {
    let board = Board::new();
    let error = board
        .adverts
        .create(Some(&author()), &submission("Recherche", "Jean"))
        .await
        .unwrap_err();
    let errors = field_errors(error);
    assert!(has_error_on(&errors, Field::Title));
    assert_eq!(board.adverts.list_page(1, 3).await.unwrap().total, 0);
}

#[tokio::test]
async fn ten_character_title_is_stored_with_defaults() {
    let board = Board::new();
    let before = Utc::now();
    let id = board
        .adverts
        .create(Some(&author()), &submission("Recherche!", "Jean"))
        .await
        .unwrap();

    let advert = board.adverts.view(id).await.unwrap().advert;
    assert_eq!(advert.id(), Some(id));
    assert!(advert.published());
    assert!(advert.date() >= before - chrono::Duration::seconds(1));
    assert!(advert.date() <= Utc::now());
    assert_eq!(advert.application_count(), 0);
    assert_eq!(advert.updated_at(), None);
}

#[tokio::test]
async fn banned_word_rejects_content() {
    let board = Board::new();
    let mut form = submission("Recherche développeur Rust", "Jean");
    form.content = "Pas d'abandon en cours de route".into();
    let errors = field_errors(board.adverts.create(Some(&author()), &form).await.unwrap_err());
    let content: Vec<_> = errors.iter().filter(|e| e.field == Field::Content).collect();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].message, "Invalid content: it contains a banned word.");
}

#[tokio::test]
async fn antiflood_holds_for_fifteen_seconds() {
    let board = Board::new();
    board
        .adverts
        .create(Some(&author()), &submission("Recherche développeur Rust", "Jean"))
        .await
        .unwrap();

    board.clock.advance(chrono::Duration::seconds(14));
    let errors = field_errors(
        board
            .adverts
            .create(Some(&author()), &submission("Mission d'intégration web", "Marine"))
            .await
            .unwrap_err(),
    );
    assert!(errors.iter().any(|e| e.field == Field::Content
        && e.message
            == "You already posted a message less than 15 seconds ago, please wait a little."));

    board.clock.advance(chrono::Duration::seconds(1));
    board
        .adverts
        .create(Some(&author()), &submission("Mission d'intégration web", "Marine"))
        .await
        .unwrap();
}

#[tokio::test]
async fn antiflood_is_per_identity() {
    let board = Board::new();
    board
        .adverts
        .create(Some(&author()), &submission("Recherche développeur Rust", "Jean"))
        .await
        .unwrap();
    board
        .adverts
        .create(Some(&admin()), &submission("Mission d'intégration web", "Marine"))
        .await
        .unwrap();
}

#[tokio::test]
async fn title_and_author_must_be_unique() {
    let board = Board::new();
    board
        .adverts
        .create(Some(&author()), &submission("Recherche développeur Rust", "Jean"))
        .await
        .unwrap();
    board.wait_cooldown();

    let errors = field_errors(
        board
            .adverts
            .create(Some(&author()), &submission("Recherche développeur Rust", "Jean"))
            .await
            .unwrap_err(),
    );
    assert!(errors
        .iter()
        .any(|e| e.message == "An advert with this title already exists."));
    assert!(errors
        .iter()
        .any(|e| e.message == "An advert by this author already exists."));
}

#[tokio::test]
async fn colliding_slugs_get_a_suffix() {
    let board = Board::new();
    let first = board
        .adverts
        .create(Some(&author()), &submission("Recherche développeur Rust", "Jean"))
        .await
        .unwrap();
    board.wait_cooldown();
    let second = board
        .adverts
        .create(Some(&author()), &submission("Recherche développeur  Rust!", "Marine"))
        .await
        .unwrap();

    let first = board.adverts.view(first).await.unwrap().advert;
    let second = board.adverts.view(second).await.unwrap().advert;
    assert_eq!(first.slug(), "recherche-developpeur-rust");
    assert_eq!(second.slug(), "recherche-developpeur-rust-1");
}

#[tokio::test]
async fn editing_refreshes_slug_and_keeps_publication() {
    let board = Board::new();
    let id = board
        .adverts
        .create(Some(&author()), &submission("Recherche développeur Rust", "Jean"))
        .await
        .unwrap();

    let form = board.adverts.edit_form(Some(&author()), id).await.unwrap();
    assert!(!form.shows(Field::Published));

    board.wait_cooldown();
    let mut edit = submission("Recherche développeuse Rust", "Jean");
    edit.published = false;
    board.adverts.update(Some(&author()), id, &edit).await.unwrap();

    let advert = board.adverts.view(id).await.unwrap().advert;
    assert_eq!(advert.title(), "Recherche développeuse Rust");
    assert_eq!(advert.slug(), "recherche-developpeuse-rust");
    assert!(advert.published());
    assert!(advert.updated_at().is_some());
}

#[tokio::test]
async fn unpublished_advert_can_be_published_later() {
    let board = Board::new();
    let mut draft = submission("Recherche développeur Rust", "Jean");
    draft.published = false;
    let id = board.adverts.create(Some(&author()), &draft).await.unwrap();

    let form = board.adverts.edit_form(Some(&author()), id).await.unwrap();
    assert!(form.shows(Field::Published));

    board.wait_cooldown();
    board
        .adverts
        .update(Some(&author()), id, &submission("Recherche développeur Rust", "Jean"))
        .await
        .unwrap();
    assert!(board.adverts.view(id).await.unwrap().advert.published());
}

#[tokio::test]
async fn categories_are_chosen_from_the_seeded_list() {
    let board = Board::new();
    let seeded = CategorySeeder::new(board.store.clone()).seed().await.unwrap();

    let mut form = submission("Recherche développeur Rust", "Jean");
    form.categories = vec![seeded[0], seeded[2]];
    let id = board.adverts.create(Some(&author()), &form).await.unwrap();
    let names: Vec<String> = board
        .adverts
        .view(id)
        .await
        .unwrap()
        .advert
        .categories()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(names, ["Développement web", "Graphisme"]);

    board.wait_cooldown();
    let mut unknown = submission("Mission d'intégration web", "Marine");
    unknown.categories = vec![domains::CategoryId(9999)];
    let errors = field_errors(board.adverts.create(Some(&author()), &unknown).await.unwrap_err());
    assert!(has_error_on(&errors, Field::Categories));
}

#[tokio::test]
async fn images_follow_their_advert() {
    let board = Board::new();
    let mut form = submission("Recherche développeur Rust", "Jean");
    form.image_url = "https://example.org/job.png".into();
    form.image_alt = "Job de rêve".into();
    let id = board.adverts.create(Some(&author()), &form).await.unwrap();
    assert_eq!(board.store.image_count().await, 1);

    board.wait_cooldown();
    form.image_url = String::new();
    board.adverts.update(Some(&author()), id, &form).await.unwrap();
    assert!(board.adverts.view(id).await.unwrap().advert.image().is_none());
    assert_eq!(board.store.image_count().await, 0);

    board.wait_cooldown();
    form.image_url = "https://example.org/other.png".into();
    board.adverts.update(Some(&author()), id, &form).await.unwrap();
    assert_eq!(board.store.image_count().await, 1);

    board.adverts.delete(Some(&author()), id).await.unwrap();
    assert_eq!(board.store.image_count().await, 0);
}

#[tokio::test]
async fn delete_removes_only_known_adverts() {
    let board = Board::new();
    let missing = board
        .adverts
        .delete(Some(&author()), AdvertId(42))
        .await
        .unwrap_err();
    assert!(missing.is_not_found());

    let id = board
        .adverts
        .create(Some(&author()), &submission("Recherche développeur Rust", "Jean"))
        .await
        .unwrap();
    let removed = board.adverts.delete(Some(&author()), id).await.unwrap();
    assert_eq!(removed.id(), Some(id));
    assert!(board.adverts.view(id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn managing_adverts_needs_an_author_role() {
    let board = Board::new();
    let form = submission("Recherche développeur Rust", "Jean");

    let anonymous = board.adverts.create(None, &form).await.unwrap_err();
    assert!(matches!(anonymous, AppError::Unauthorized(_)));

    let visitor = Identity::new("visiteur", Vec::<Role>::new());
    let forbidden = board.adverts.create(Some(&visitor), &form).await.unwrap_err();
    assert!(matches!(forbidden, AppError::Forbidden(_)));
}

#[tokio::test]
async fn long_titles_get_a_slug_that_fits_its_column() {
    let board = Board::new();
    let title = format!("Recherche {}", "développeur ".repeat(17));
    assert!(title.chars().count() > 200);
    let id = board
        .adverts
        .create(Some(&author()), &submission(&title, "Jean"))
        .await
        .unwrap();
    board.wait_cooldown();
    let twin = board
        .adverts
        .create(Some(&author()), &submission(&format!("{title}!"), "Marine"))
        .await
        .unwrap();

    let first = board.adverts.view(id).await.unwrap().advert;
    let second = board.adverts.view(twin).await.unwrap().advert;
    assert!(first.slug().len() <= domains::slug::MAX_LENGTH);
    assert!(second.slug().len() <= domains::slug::MAX_LENGTH);
    assert!(second.slug().ends_with("-1"));
    assert!(!first.slug().ends_with('-'));
}

#[tokio::test]
async fn over_long_title_is_a_field_error() {
    let board = Board::new();
    let errors = field_errors(
        board
            .adverts
            .create(Some(&author()), &submission(&"t".repeat(256), "Jean"))
            .await
            .unwrap_err(),
    );
    assert!(has_error_on(&errors, Field::Title));
}
