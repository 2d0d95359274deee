use comms::msg::{Command, Msg, Payload};
use comms::specs::table::TableShape;
use tokio::io;

#[tokio::test]
async fn send_recv_values() -> io::Result<()> {
    const SIZE: usize = 4096;

    let (one, two) = io::duplex(SIZE);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    let values = [1.0_f32, 2.0, 3.0, 4.0];
    tx.send(&Msg::Data(Payload::Values(&values))).await?;

    let (rx, tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let mut rx_buf: Vec<u32> = Vec::new();
    let Msg::Data(Payload::Values(got)) = rx.recv_into(&mut rx_buf).await? else {
        panic!("expected values");
    };

    assert_eq!(got, values);
    Ok(())
}

#[tokio::test]
async fn frames_stay_in_order() -> io::Result<()> {
    let (one, two) = io::duplex(4096);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);
    let (rx, peer_tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, peer_tx);

    let shape = TableShape::Matrix { rows: 2, cols: 2 };
    let delta = [5.0_f32, 5.0];

    let sender = async move {
        tx.send(&Msg::Control(Command::NewTable(shape))).await?;
        let msg = Msg::Data(Payload::Add {
            table: 0,
            rows: &[0],
            values: &delta,
        });
        tx.send(&msg).await?;
        tx.send(&Msg::Control(Command::Barrier)).await?;
        Ok::<_, io::Error>(())
    };

    let receiver = async move {
        let mut rx_buf: Vec<u32> = Vec::new();

        let msg: Msg = rx.recv_into(&mut rx_buf).await?;
        assert!(matches!(msg, Msg::Control(Command::NewTable(s)) if s == shape));
        drop(msg);

        let Msg::Data(Payload::Add {
            table,
            rows,
            values,
        }) = rx.recv_into(&mut rx_buf).await?
        else {
            panic!("expected an add");
        };
        assert_eq!((table, rows, values), (0, &[0][..], &[5.0, 5.0][..]));

        let msg: Msg = rx.recv_into(&mut rx_buf).await?;
        assert!(matches!(msg, Msg::Control(Command::Barrier)));
        Ok::<_, io::Error>(())
    };

    tokio::try_join!(sender, receiver)?;
    Ok(())
}

#[tokio::test]
async fn errors_carry_text() -> io::Result<()> {
    let (one, two) = io::duplex(1024);
    let (rx, tx) = io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);
    let (rx, peer_tx) = io::split(two);
    let (mut rx, _) = comms::channel(rx, peer_tx);

    tx.send(&Msg::Err("unknown table 3".into())).await?;

    let mut rx_buf: Vec<u32> = Vec::new();
    let Msg::Err(text) = rx.recv_into(&mut rx_buf).await? else {
        panic!("expected an error");
    };

    assert_eq!(text, "unknown table 3");
    Ok(())
}
