//! Paging through the board, newest first.

use std::collections::BTreeSet;

use domains::{AdvertId, AppError};
use integration_tests::{author, submission, Board};

/// Posts `count` adverts dated one day apart, oldest first.
async fn board_with(count: u32) -> (Board, Vec<AdvertId>) {
    let board = Board::new();
    let mut ids = Vec::new();
    for n in 1..=count {
        let mut form = submission(&format!("Offre numéro {n} à Lyon"), &format!("Auteur {n}"));
        form.date = Some(format!("2019-07-{n:02}T10:00"));
        ids.push(board.adverts.create(Some(&author()), &form).await.unwrap());
        board.wait_cooldown();
    }
    (board, ids)
}

#[tokio::test]
async fn page_zero_is_invalid() {
    let (board, _) = board_with(2).await;
    for page in [0, -1] {
        let error = board.adverts.list_page(page, 3).await.unwrap_err();
        assert!(matches!(error, AppError::InvalidPage(p) if p == page));
    }
}

#[tokio::test]
async fn page_past_the_end_is_not_found() {
    let (board, _) = board_with(7).await;
    assert_eq!(board.adverts.list_page(3, 3).await.unwrap().total_pages, 3);
    assert!(board.adverts.list_page(4, 3).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn pages_partition_the_board_newest_first() {
    let (board, ids) = board_with(7).await;

    let mut seen = Vec::new();
    for page in 1..=3 {
        let listed = board.adverts.list_page(page, 3).await.unwrap();
        assert_eq!(listed.page, page as u64);
        assert_eq!(listed.total, 7);
        seen.extend(listed.items);
    }

    let dates: Vec<_> = seen.iter().map(|a| a.date()).collect();
    assert!(dates.windows(2).all(|pair| pair[0] > pair[1]));

    let listed: Vec<AdvertId> = seen.iter().filter_map(|a| a.id()).collect();
    let unique: BTreeSet<_> = listed.iter().copied().collect();
    assert_eq!(listed.len(), 7);
    assert_eq!(unique, ids.iter().copied().collect());
    assert_eq!(listed.first(), ids.last());
}

#[tokio::test]
async fn empty_board_has_one_empty_page() {
    let board = Board::new();
    let first = board.adverts.list_page(1, 3).await.unwrap();
    assert!(first.items.is_empty());
    assert_eq!(first.total_pages, 0);
    assert!(board.adverts.list_page(2, 3).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn zero_page_size_is_refused() {
    let (board, _) = board_with(1).await;
    let error = board.adverts.list_page(1, 0).await.unwrap_err();
    assert!(matches!(error, AppError::InvalidRequest(_)));
}

#[tokio::test]
async fn menu_shows_the_most_recent() {
    let (board, ids) = board_with(5).await;
    let recent: Vec<AdvertId> = board
        .adverts
        .recent_adverts(3)
        .await
        .unwrap()
        .iter()
        .filter_map(|a| a.id())
        .collect();
    assert_eq!(recent, vec![ids[4], ids[3], ids[2]]);
}
