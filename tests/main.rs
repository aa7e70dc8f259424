//! End-to-end scenarios: a real server on loopback, driven like a client
//! would, asserting the reply/data ordering the engine guarantees.

use ftpcore::storage::mem::Mem;
use ftpcore::Server;

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(port: u16) -> Client {
        // The server task may still be binding; try for a bit.
        for _ in 0..50 {
            if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
                let (read_half, write_half) = stream.into_split();
                return Client {
                    reader: BufReader::new(read_half),
                    writer: write_half,
                };
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("server on port {} never came up", port);
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(format!("{}\r\n", line).as_bytes()).await.unwrap();
    }

    /// Reads one full reply, following the multi-line convention.
    async fn reply(&mut self) -> (u16, String) {
        let mut first = String::new();
        let n = self.reader.read_line(&mut first).await.unwrap();
        assert!(n >= 4, "short reply line: {:?}", first);
        let code: u16 = first[..3].parse().unwrap_or_else(|_| panic!("no reply code in {:?}", first));
        let mut text = first.clone();
        if first.as_bytes()[3] == b'-' {
            loop {
                let mut line = String::new();
                self.reader.read_line(&mut line).await.unwrap();
                text.push_str(&line);
                if line.len() >= 4 && line[..3] == first[..3] && line.as_bytes()[3] == b' ' {
                    break;
                }
            }
        }
        (code, text)
    }

    async fn expect(&mut self, code: u16) -> String {
        let (got, text) = self.reply().await;
        assert_eq!(got, code, "unexpected reply: {}", text);
        text
    }

    async fn login(&mut self) {
        self.expect(220).await;
        self.send("USER anonymous").await;
        self.expect(331).await;
        self.send("PASS x@example.com").await;
        self.expect(230).await;
    }
}

fn start_server(port: u16, passive_ports: std::ops::RangeInclusive<u16>, mem: Mem) {
    let server = Server::new(Arc::new(mem)).passive_ports(passive_ports);
    tokio::spawn(async move {
        server.listen(&format!("127.0.0.1:{}", port)).await.unwrap();
    });
}

fn parse_pasv(reply: &str) -> u16 {
    let open = reply.find('(').expect("no ( in PASV reply");
    let close = reply.find(')').expect("no ) in PASV reply");
    let fields: Vec<u16> = reply[open + 1..close].split(',').map(|f| f.trim().parse().unwrap()).collect();
    assert_eq!(fields.len(), 6, "bad PASV reply: {}", reply);
    fields[4] * 256 + fields[5]
}

async fn read_to_end(mut stream: TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    buf
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn passive_retrieve_round_trip() {
    let content: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let mem = Mem::with_files(vec![("/f", content.clone())]);
    start_server(21410, 50100..=50149, mem);

    let mut client = Client::connect(21410).await;
    client.login().await;
    client.send("TYPE I").await;
    client.expect(200).await;
    client.send("PASV").await;
    let pasv = client.expect(227).await;
    let data_port = parse_pasv(&pasv);

    let data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("RETR /f").await;
    client.expect(150).await;
    // The 150 is in hand before we pull a single data byte.
    let received = read_to_end(data).await;
    assert_eq!(received, content);
    client.expect(226).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rnfr_admits_only_rnto() {
    let mem = Mem::with_files(vec![("/a", b"payload".to_vec())]);
    start_server(21411, 50150..=50199, mem.clone());

    let mut client = Client::connect(21411).await;
    client.login().await;
    client.send("RNFR a").await;
    client.expect(350).await;
    // STOR is not in RNFR's successor set.
    client.send("STOR b").await;
    client.expect(503).await;
    // The rejected command had no side effects; the rename still works.
    client.send("RNTO b").await;
    client.expect(250).await;
    assert_eq!(mem.content("/b").unwrap(), b"payload");
    assert!(mem.content("/a").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_marker_is_consumed_by_one_transfer() {
    let content: Vec<u8> = (0..600u32).map(|i| (i % 13) as u8 + b'a').collect();
    let mem = Mem::with_files(vec![("/f", content.clone())]);
    start_server(21412, 50200..=50249, mem);

    let mut client = Client::connect(21412).await;
    client.login().await;
    client.send("TYPE I").await;
    client.expect(200).await;
    client.send("PASV").await;
    let data_port = parse_pasv(&client.expect(227).await);

    // First, a plain transfer.
    let data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("RETR /f").await;
    client.expect(150).await;
    assert_eq!(read_to_end(data).await, content);
    client.expect(226).await;

    // REST 100 and the transfer that consumes it.
    client.send("REST 100").await;
    client.expect(350).await;
    let data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("RETR /f").await;
    client.expect(150).await;
    assert_eq!(read_to_end(data).await, &content[100..]);
    client.expect(226).await;

    // The marker was consumed; the next transfer starts at zero again.
    let data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("RETR /f").await;
    client.expect(150).await;
    assert_eq!(read_to_end(data).await, content);
    client.expect(226).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abort_mid_transfer_renders_426_then_226() {
    let mem = Mem::with_files(vec![("/big", vec![0u8; 16 * 1024 * 1024])]);
    start_server(21413, 50250..=50299, mem);

    let mut client = Client::connect(21413).await;
    client.login().await;
    client.send("TYPE I").await;
    client.expect(200).await;
    client.send("PASV").await;
    let data_port = parse_pasv(&client.expect(227).await);

    let mut data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("RETR /big").await;
    client.expect(150).await;

    // Take a little, then stop reading so the sender backpressures.
    let mut sip = [0u8; 1024];
    data.read_exact(&mut sip).await.unwrap();

    client.send("ABOR").await;
    client.expect(426).await;
    client.expect(226).await;
    drop(data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_transfer_verb_is_refused_with_425() {
    let mem = Mem::with_files(vec![("/big", vec![7u8; 16 * 1024 * 1024]), ("/f", b"small".to_vec())]);
    start_server(21414, 50300..=50349, mem);

    let mut client = Client::connect(21414).await;
    client.login().await;
    client.send("TYPE I").await;
    client.expect(200).await;
    client.send("PASV").await;
    let data_port = parse_pasv(&client.expect(227).await);

    let mut data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("RETR /big").await;
    client.expect(150).await;
    let mut sip = [0u8; 1024];
    data.read_exact(&mut sip).await.unwrap();

    // The running transfer is undisturbed; the newcomer gets 425.
    client.send("RETR /f").await;
    client.expect(425).await;

    client.send("ABOR").await;
    client.expect(426).await;
    client.expect(226).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_disconnects_with_421() {
    let (trigger_tx, trigger_rx) = tokio::sync::oneshot::channel::<()>();
    let mem = Mem::new();
    let server = Server::new(Arc::new(mem)).passive_ports(50350..=50399).shutdown_indicator(async move {
        let _ = trigger_rx.await;
    });
    tokio::spawn(async move {
        server.listen("127.0.0.1:21415").await.unwrap();
    });

    let mut client = Client::connect(21415).await;
    client.login().await;
    trigger_tx.send(()).unwrap();
    client.expect(421).await;
    // The server hangs up after the 421.
    let mut rest = Vec::new();
    client.reader.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stor_to_unwritable_path_fails_before_any_data() {
    let mem = Mem::new();
    start_server(21416, 50400..=50449, mem);

    let mut client = Client::connect(21416).await;
    client.login().await;
    client.send("PASV").await;
    let data_port = parse_pasv(&client.expect(227).await);
    let data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    // Give the acceptor a moment to register the connection.
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.send("STOR /nodir/f").await;
    client.expect(550).await;
    // The data channel closes without a byte having crossed it.
    let leftovers = read_to_end(data).await;
    assert!(leftovers.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stor_stream_round_trip() {
    let mem = Mem::new();
    start_server(21417, 50450..=50499, mem.clone());

    let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 241) as u8).collect();
    let mut client = Client::connect(21417).await;
    client.login().await;
    client.send("TYPE I").await;
    client.expect(200).await;
    client.send("PASV").await;
    let data_port = parse_pasv(&client.expect(227).await);

    let mut data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("STOR /up").await;
    client.expect(150).await;
    data.write_all(&payload).await.unwrap();
    data.shutdown().await.unwrap();
    client.expect(226).await;
    assert_eq!(mem.content("/up").unwrap(), payload);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stor_in_block_mode_reassembles_frames() {
    let mem = Mem::new();
    start_server(21418, 50500..=50549, mem.clone());

    let mut client = Client::connect(21418).await;
    client.login().await;
    client.send("TYPE I").await;
    client.expect(200).await;
    client.send("MODE B").await;
    client.expect(200).await;
    client.send("PASV").await;
    let data_port = parse_pasv(&client.expect(227).await);

    let mut data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("STOR /framed").await;
    client.expect(150).await;

    // Two frames; the EOF descriptor rides on the second.
    let first = b"hello ";
    let second = b"blocks";
    let mut wire = Vec::new();
    wire.extend_from_slice(&[0x00, 0x00, first.len() as u8]);
    wire.extend_from_slice(first);
    wire.extend_from_slice(&[0x40, 0x00, second.len() as u8]);
    wire.extend_from_slice(second);
    data.write_all(&wire).await.unwrap();

    client.expect(226).await;
    assert_eq!(mem.content("/framed").unwrap(), b"hello blocks");
    drop(data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ascii_type_normalizes_line_endings_on_store() {
    let mem = Mem::new();
    start_server(21419, 50550..=50599, mem.clone());

    let mut client = Client::connect(21419).await;
    client.login().await;
    // TYPE A is the default, set it anyway.
    client.send("TYPE A").await;
    client.expect(200).await;
    client.send("PASV").await;
    let data_port = parse_pasv(&client.expect(227).await);

    let mut data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("STOR /text").await;
    client.expect(150).await;
    data.write_all(b"first\r\nsecond\r\n").await.unwrap();
    data.shutdown().await.unwrap();
    client.expect(226).await;
    assert_eq!(mem.content("/text").unwrap(), b"first\nsecond\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn active_mode_retrieve() {
    let content = b"active mode payload".to_vec();
    start_server(21423, 50750..=50799, Mem::with_files(vec![("/f", content.clone())]));

    let mut client = Client::connect(21423).await;
    client.login().await;
    client.send("TYPE I").await;
    client.expect(200).await;

    // The client listens; the server connects out on the transfer verb.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    client.send(&format!("PORT 127,0,0,1,{},{}", port >> 8, port & 0xFF)).await;
    client.expect(200).await;

    client.send("RETR /f").await;
    client.expect(150).await;
    let (data, _) = listener.accept().await.unwrap();
    assert_eq!(read_to_end(data).await, content);
    client.expect(226).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commands_require_login() {
    start_server(21420, 50600..=50649, Mem::new());

    let mut client = Client::connect(21420).await;
    client.expect(220).await;
    // FEAT is part of the pre-login set.
    client.send("FEAT").await;
    client.expect(211).await;
    // FEAT placed no restriction on its successor, so CWD passes the
    // sequence check and runs into the authentication gate instead.
    client.send("CWD /").await;
    client.expect(530).await;
    client.send("USER someone").await;
    client.expect(331).await;
    client.send("PASS pw").await;
    client.expect(230).await;
    client.send("CWD /").await;
    client.expect(250).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequencing_and_syntax_errors() {
    start_server(21421, 50650..=50699, Mem::new());

    let mut client = Client::connect(21421).await;
    client.expect(220).await;
    // PASS may not precede USER.
    client.send("PASS secret").await;
    client.expect(503).await;
    // Unknown verbs render 500, missing arguments 501.
    client.send("XYZZY").await;
    client.expect(500).await;
    client.send("RETR").await;
    client.expect(501).await;
    // NOOP is special and admissible any time.
    client.send("NOOP").await;
    client.expect(200).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn listing_and_directory_commands() {
    let mem = Mem::with_files(vec![("/docs/readme", b"hi".to_vec())]);
    start_server(21422, 50700..=50749, mem);

    let mut client = Client::connect(21422).await;
    client.login().await;
    client.send("PWD").await;
    let pwd = client.expect(257).await;
    assert!(pwd.contains("\"/\""));
    client.send("CWD docs").await;
    client.expect(250).await;
    client.send("PASV").await;
    let data_port = parse_pasv(&client.expect(227).await);
    let data = TcpStream::connect(("127.0.0.1", data_port)).await.unwrap();
    client.send("NLST").await;
    client.expect(150).await;
    let listing = String::from_utf8(read_to_end(data).await).unwrap();
    assert_eq!(listing, "readme\r\n");
    client.expect(226).await;
    client.send("CDUP").await;
    client.expect(250).await;
    client.send("QUIT").await;
    client.expect(221).await;
}
