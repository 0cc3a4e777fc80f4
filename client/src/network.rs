use crate::display;
use log::{debug, info, warn};
use shared::{read_frame, write_frame, FrameError, Message};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Terminal client: prints what the server sends and answers its prompts
/// with lines read from `input`.
pub struct Client<I> {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    input: Lines<I>,
    nickname: Option<String>,
}

impl<I> Client<I>
where
    I: AsyncBufRead + Unpin,
{
    pub async fn connect(
        server_addr: &str,
        input: I,
        nickname: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", server_addr);

        let (reader, writer) = stream.into_split();
        Ok(Client {
            reader,
            writer,
            input: input.lines(),
            nickname,
        })
    }

    async fn send(&mut self, message: Message) -> Result<(), FrameError> {
        debug!("Sending {}", message.kind());
        write_frame(&mut self.writer, &message).await
    }

    /// Next line of input, or `None` once input is exhausted.
    async fn prompt(&mut self, text: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        println!("{}", text);
        Ok(self.input.next_line().await?)
    }

    async fn identify(&mut self) -> Result<bool, Box<dyn std::error::Error>> {
        let nickname = match self.nickname.take() {
            Some(nickname) => nickname,
            None => match self.prompt("Enter your nickname:").await? {
                Some(line) => line,
                None => return Ok(false),
            },
        };
        self.send(Message::IdentifySubmit { nickname }).await?;
        Ok(true)
    }

    /// Runs until the server hangs up or input ends.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.identify().await? {
            return Ok(());
        }

        loop {
            let message = match read_frame(&mut self.reader).await? {
                Some(message) => message,
                None => {
                    println!("Server closed the connection");
                    return Ok(());
                }
            };

            if !self.handle_message(message).await? {
                info!("Input closed, leaving");
                return Ok(());
            }
        }
    }

    /// Returns false when the player's input has ended.
    async fn handle_message(&mut self, message: Message) -> Result<bool, Box<dyn std::error::Error>> {
        match message {
            Message::IdentifyAck { message, .. } => println!("{}", message),
            Message::IdentifyRejected { reason } => {
                println!("Nickname rejected: {}", reason);
                return self.identify().await;
            }
            Message::LeaderboardSnapshot { entries } => {
                println!("{}", display::leaderboard(&entries))
            }
            Message::ConnectedPlayers { names } => {
                println!("{}", display::connected_players(&names))
            }
            Message::GameList { games } => {
                let game = match self.prompt(&display::game_list(&games)).await? {
                    Some(line) => line.trim().to_string(),
                    None => return Ok(false),
                };
                self.send(Message::JoinRequest { game }).await?;
            }
            Message::JoinAck { message, .. } => println!("{}", message),
            Message::StartPrompt { message, .. } => {
                let answer = match self.prompt(&message).await? {
                    Some(line) => line,
                    None => return Ok(false),
                };
                self.send(Message::StartResponse { answer }).await?;
            }
            Message::RoundStart { round } => {
                let mut text = format!("Round {} has begun. Enter your guess (0-100):", round);
                let guess = loop {
                    let line = match self.prompt(&text).await? {
                        Some(line) => line,
                        None => return Ok(false),
                    };
                    match display::parse_guess(&line) {
                        Ok(guess) => break guess,
                        Err(hint) => text = hint,
                    }
                };
                self.send(Message::GuessSubmit { guess }).await?;
            }
            Message::Eliminated { message, .. } => println!("{}", message),
            Message::RoundResult {
                round,
                standings,
                winner,
                eliminated,
            } => println!(
                "{}",
                display::round_result(round, &standings, winner.as_deref(), &eliminated)
            ),
            Message::GameOver { message, .. } => println!("{}", message),
            Message::Ping => self.send(Message::Pong).await?,
            other => warn!("Ignoring unexpected {} from server", other.kind()),
        }
        Ok(true)
    }
}
