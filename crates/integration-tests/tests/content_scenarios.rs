use integration_tests::Board;
use tokio_test::{assert_err, assert_ok};
use yb_core::{AppError, RatingOutcome, RatingState, YellKind};

#[tokio::test]
async fn test_like_then_unlike_round_trip() -> anyhow::Result<()> {
    let board = Board::in_memory().await?;
    let author = board.user("author").await?;
    let critic = board.user("critic").await?;
    let post = board.post(author, "binary search").await?;

    let liked = board.ratings.like(post, critic).await?;
    assert_eq!(liked.transition.outcome, RatingOutcome::Liked);
    assert_eq!(liked.rating_total, 1);

    let unliked = board.ratings.unlike(post, critic).await?;
    assert_eq!(unliked.transition.outcome, RatingOutcome::Unliked);
    assert_eq!(unliked.rating_total, 0);

    let again = board.ratings.unlike(post, critic).await?;
    assert_eq!(again.transition.outcome, RatingOutcome::AlreadyUnliked);
    assert!(again.transition.outcome.is_warning());
    assert_eq!(again.rating_total, 0);

    assert_eq!(board.ratings.status(post, critic).await?, RatingState::Unliked);
    let stored = board.store.get(post, YellKind::Post).await?;
    assert_eq!(stored.yell.rating_total, 0);
    Ok(())
}

#[tokio::test]
async fn test_comments_are_counted_and_ordered() -> anyhow::Result<()> {
    let board = Board::in_memory().await?;
    let author = board.user("author").await?;
    let helper = board.user("helper").await?;
    let request = board.request(author, "lifetimes help").await?;

    let mut posted = Vec::new();
    for text in ["first reply", "second reply", "third reply"] {
        posted.push(board.comments.post_comment(helper, request, text).await?);
    }

    let stored = board.store.get(request, YellKind::Request).await?;
    assert_eq!(stored.yell.comment_count, 3);

    let thread = board.store.comments(request).await?;
    assert_eq!(thread.set.owning_yell_id, request);
    let ids: Vec<_> = thread.comments.iter().map(|(yell, _)| yell.id).collect();
    assert_eq!(ids, posted);
    let texts: Vec<_> = thread
        .comments
        .iter()
        .map(|(_, comment)| comment.content.as_str())
        .collect();
    assert_eq!(texts, ["first reply", "second reply", "third reply"]);
    Ok(())
}

#[tokio::test]
async fn test_comments_are_rateable_yells() -> anyhow::Result<()> {
    let board = Board::in_memory().await?;
    let author = board.user("author").await?;
    let critic = board.user("critic").await?;
    let post = board.post(author, "binary search").await?;
    let comment = board.comments.post_comment(author, post, "nice one").await?;

    let receipt = board.ratings.like(comment, critic).await?;
    assert_eq!(receipt.rating_total, 1);

    // The host's counters are untouched by ratings on its comments.
    let host = board.store.get(post, YellKind::Post).await?;
    assert_eq!(host.yell.rating_total, 0);
    assert_eq!(host.yell.comment_count, 1);

    let nested = board.comments.post_comment(critic, comment, "replying to a reply").await;
    assert!(matches!(nested, Err(AppError::ValidationError(_))));

    let missing = board.comments.post_comment(critic, yb_core::YellId(9_999), "hello there").await;
    assert_err!(missing);
    Ok(())
}

#[tokio::test]
async fn test_many_critics_settle_on_exact_total() -> anyhow::Result<()> {
    let board = Board::in_memory().await?;
    let author = board.user("author").await?;
    let post = board.post(author, "binary search").await?;

    let mut critics = Vec::new();
    for i in 0..8 {
        critics.push(board.user(&format!("critic{i}")).await?);
    }

    let mut handles = Vec::new();
    for critic in critics {
        let ratings = board.ratings.clone();
        handles.push(tokio::spawn(async move { ratings.like(post, critic).await }));
    }
    for handle in handles {
        let receipt = assert_ok!(handle.await?);
        assert_eq!(receipt.transition.outcome, RatingOutcome::Liked);
    }

    let stored = board.store.get(post, YellKind::Post).await?;
    assert_eq!(stored.yell.rating_total, 8);
    Ok(())
}
