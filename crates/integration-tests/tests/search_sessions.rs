use integration_tests::Board;
use tokio::task::JoinHandle;
use yb_core::search::{
    ChannelTransport, ClientEnd, SearchSession, SessionEnd, SessionSummary, ADVANCE_TOKEN,
    END_OF_RESULTS,
};
use yb_core::YellId;

// No fixture text contains a 'q', so only titles built from it can score.
const QUERY: &str = "qqqqqqqq";

fn spawn_session(session: SearchSession) -> (JoinHandle<SessionSummary>, ClientEnd) {
    let (transport, client) = ChannelTransport::pair(32);
    let handle = tokio::spawn(async move {
        let mut transport = transport;
        session.run(&mut transport).await
    });
    (handle, client)
}

#[tokio::test]
async fn test_single_match_flushes_without_ack() -> anyhow::Result<()> {
    let board = Board::in_memory().await?;
    let author = board.user("author").await?;

    let mut target = None;
    for i in 0..20 {
        if i == 7 {
            target = Some(board.post(author, QUERY).await?);
        } else {
            board.post(author, &format!("sorting notes {i}")).await?;
        }
    }

    let session = board.search.open(QUERY).await?;
    let (handle, mut client) = spawn_session(session);

    let first = client.from_server.recv().await;
    assert_eq!(first, target.map(|id| id.to_string()));
    assert_eq!(client.from_server.recv().await.as_deref(), Some(END_OF_RESULTS));

    let summary = handle.await?;
    assert_eq!(summary.end, SessionEnd::Completed);
    assert_eq!(summary.scanned, 20);
    assert_eq!(summary.results, 1);
    assert_eq!(summary.batches, 1);
    Ok(())
}

#[tokio::test]
async fn test_results_arrive_in_acknowledged_batches() -> anyhow::Result<()> {
    let board = Board::in_memory().await?;
    let author = board.user("author").await?;

    let mut matches: Vec<YellId> = Vec::new();
    for _ in 0..20 {
        matches.push(board.post(author, QUERY).await?);
    }
    board.request(author, "unrelated help").await?;

    let session = board.search.open(QUERY).await?;
    let (handle, mut client) = spawn_session(session);

    let mut received = Vec::new();
    for _ in 0..15 {
        received.push(client.from_server.recv().await.unwrap_or_default());
    }
    // Nothing more arrives until the client asks for it.
    assert!(client.from_server.try_recv().is_err());

    client.to_server.send(ADVANCE_TOKEN.to_string()).await?;
    for _ in 0..5 {
        received.push(client.from_server.recv().await.unwrap_or_default());
    }
    assert_eq!(client.from_server.recv().await.as_deref(), Some(END_OF_RESULTS));

    let mut expected: Vec<String> = matches.iter().map(|id| id.to_string()).collect();
    expected.sort();
    received.sort();
    assert_eq!(received, expected);

    let summary = handle.await?;
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.results, 20);
    Ok(())
}

#[tokio::test]
async fn test_writes_after_open_are_invisible() -> anyhow::Result<()> {
    let board = Board::in_memory().await?;
    let author = board.user("author").await?;

    let session = board.search.open(QUERY).await?;
    board.post(author, QUERY).await?;

    let (handle, mut client) = spawn_session(session);
    assert_eq!(client.from_server.recv().await.as_deref(), Some(END_OF_RESULTS));
    assert_eq!(handle.await?.results, 0);
    Ok(())
}

#[tokio::test]
async fn test_client_leaving_mid_session() -> anyhow::Result<()> {
    let board = Board::in_memory().await?;
    let author = board.user("author").await?;
    for _ in 0..16 {
        board.post(author, QUERY).await?;
    }

    let session = board.search.open(QUERY).await?;
    let (handle, mut client) = spawn_session(session);
    for _ in 0..15 {
        client.from_server.recv().await;
    }
    drop(client);

    let summary = handle.await?;
    assert_eq!(summary.end, SessionEnd::Disconnected);
    assert_eq!(summary.results, 15);
    Ok(())
}
