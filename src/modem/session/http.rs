// src/modem/session/http.rs

use super::SessionManager;
use crate::common::{
    command::AtCommand,
    error::{ModemError, Precondition},
    hal_traits::{ModemClock, ModemSerial},
    log::{modem_log, Level, ModemLog},
    response::ReceiveStatus,
    timing, CommLineStatus, GsmStatus,
};
use crate::modem::receiver::CTRL_Z;
use core::fmt;
use embedded_hal::digital::OutputPin;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Method {
    Get,
    Post { content_length: usize },
}

/// Request line and headers of a minimal HTTP request.
///
/// `Display` renders the head including the blank line that ends it; the
/// engine streams it straight to the modem so no request buffer is needed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HttpRequest<'a> {
    method: Method,
    host: &'a str,
    path: &'a str,
    user_agent: &'a str,
}

impl<'a> HttpRequest<'a> {
    /// HTTP/1.0 `GET`.
    pub fn get(host: &'a str, path: &'a str, user_agent: &'a str) -> Self {
        HttpRequest { method: Method::Get, host, path, user_agent }
    }

    /// HTTP/1.1 form `POST` announcing a body of `content_length` bytes.
    pub fn post(host: &'a str, path: &'a str, user_agent: &'a str, content_length: usize) -> Self {
        HttpRequest {
            method: Method::Post { content_length },
            host,
            path,
            user_agent,
        }
    }
}

impl fmt::Display for HttpRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            Method::Get => write!(f, "GET {} HTTP/1.0\r\n", self.path)?,
            Method::Post { .. } => write!(f, "POST {} HTTP/1.1\r\n", self.path)?,
        }
        write!(f, "Host: {}\r\nUser-Agent: {}\r\n", self.host, self.user_agent)?;
        if let Method::Post { content_length } = self.method {
            f.write_str("Content-Type: application/x-www-form-urlencoded\r\n")?;
            write!(f, "Content-Length: {}\r\n", content_length)?;
        }
        f.write_str("\r\n")
    }
}

impl<IF, ON, RST, L> SessionManager<IF, ON, RST, L>
where
    IF: ModemSerial + ModemClock,
    ON: OutputPin,
    RST: OutputPin,
    L: ModemLog,
{
    /// Fetches `path` from `server` with an HTTP/1.0 GET.
    ///
    /// When `out` is given the reply is read into it until the link goes
    /// quiet or the buffer is full, and the number of bytes stored is
    /// returned. Without `out` the request is only sent and `Ok(0)` is
    /// returned. No request bytes are written unless a connection was made.
    pub fn http_get(
        &mut self,
        server: &str,
        port: u16,
        path: &str,
        out: Option<&mut [u8]>,
    ) -> Result<usize, ModemError<IF::Error>> {
        self.require_initialized()?;
        if let Err(e) = check_request_args(server, path, out.as_deref()) {
            modem_log!(self.modem.log, Level::Error, "server, path or output buffer missing");
            return Err(e.into());
        }

        let result = self.get_sequence(server, port, path, out);
        // A transparent GET leaves the link in data mode; everything else
        // is back at the command prompt.
        let in_data = self.modem.data_mode().is_transparent() && self.modem.gsm_status().has_tcp_session();
        self.release_comm_line(in_data);
        result
    }

    fn get_sequence(
        &mut self,
        server: &str,
        port: u16,
        path: &str,
        out: Option<&mut [u8]>,
    ) -> Result<usize, ModemError<IF::Error>> {
        self.connect_with_retries(server, port)?;

        self.modem.write_display(&HttpRequest::get(server, path, &self.user_agent))?;

        // In transparent mode the bytes are already on the socket.
        if !self.modem.data_mode().is_transparent() {
            self.modem.write_bytes(&[CTRL_Z])?;
            let status = self.modem.receive(timing::GET_SEND_CONFIRM, Some("SEND OK"))?;
            self.modem.check_stage(status, "http send")?;
        }

        self.read_response(out)
    }

    /// Sends `body` as a form POST to `server`/`path`.
    ///
    /// An already open connection (per `AT+CIPSTATUS`) is reused: the send
    /// window is primed again, or data mode re-entered when transparent.
    /// The reply is read as for [`http_get`](Self::http_get).
    pub fn http_post(
        &mut self,
        server: &str,
        port: u16,
        path: &str,
        body: &[u8],
        out: Option<&mut [u8]>,
    ) -> Result<usize, ModemError<IF::Error>> {
        self.require_initialized()?;
        if let Err(e) = check_request_args(server, path, out.as_deref()) {
            modem_log!(self.modem.log, Level::Error, "server, path or output buffer missing");
            return Err(e.into());
        }

        let result = self.post_sequence(server, port, path, body, out);
        self.release_comm_line(false);
        result
    }

    fn post_sequence(
        &mut self,
        server: &str,
        port: u16,
        path: &str,
        body: &[u8],
        out: Option<&mut [u8]>,
    ) -> Result<usize, ModemError<IF::Error>> {
        let status = self.modem.exchange(&AtCommand::TcpStatus, timing::TCP_STATUS, Some("STATE: CONNECT OK"))?;
        if status == ReceiveStatus::FinishedMatch {
            self.reprime_connection()?;
        } else {
            self.connect_with_retries(server, port)?;
        }

        modem_log!(self.modem.log, Level::Debug, "start sending data");
        self.modem
            .write_display(&HttpRequest::post(server, path, &self.user_agent, body.len()))?;
        self.modem.write_bytes(body)?;

        let status = if self.modem.data_mode().is_transparent() {
            self.escape_data_mode()?
        } else {
            self.modem.write_bytes(&[CTRL_Z])?;
            self.modem.receive(timing::POST_SEND_CONFIRM, Some("SEND OK"))?
        };
        self.modem.check_stage(status, "http send")?;
        modem_log!(self.modem.log, Level::Info, "data have been successfully sent");

        self.read_response(out)
    }

    fn release_comm_line(&mut self, in_data: bool) {
        self.modem.set_comm_status(if in_data {
            CommLineStatus::Data
        } else {
            CommLineStatus::Free
        });
    }

    fn reprime_connection(&mut self) -> Result<(), ModemError<IF::Error>> {
        modem_log!(self.modem.log, Level::Debug, "reusing open connection");
        if self.modem.data_mode().is_transparent() {
            self.modem.step(&AtCommand::ReturnToData, timing::SEND_PROMPT, "CONNECT")?;
        } else {
            self.modem.step(&AtCommand::TcpSend, timing::SEND_PROMPT, ">")?;
        }
        self.modem.set_gsm_status(GsmStatus::TcpClientConnected);
        self.modem.set_comm_status(CommLineStatus::Data);
        Ok(())
    }

    /// Up to `TCP_CONNECT_ATTEMPTS` connects. A precondition failure is
    /// returned at once; otherwise the last attempt's error is kept.
    fn connect_with_retries(&mut self, server: &str, port: u16) -> Result<(), ModemError<IF::Error>> {
        let mut last = ModemError::NoResponse { stage: "tcp connect" };
        for attempt in 0..timing::TCP_CONNECT_ATTEMPTS {
            match self.connect_tcp(server, port) {
                Ok(()) => {
                    modem_log!(self.modem.log, Level::Info, "connected to server {}", server);
                    return Ok(());
                }
                Err(e @ ModemError::PreconditionFailed(_)) => return Err(e),
                Err(e) => {
                    modem_log!(self.modem.log, Level::Debug, "connecting... attempt {} failed: {}", attempt + 1, e);
                    last = e;
                }
            }
        }
        modem_log!(self.modem.log, Level::Info, "not connected to server {}", server);
        Err(last)
    }

    fn read_response(&mut self, out: Option<&mut [u8]>) -> Result<usize, ModemError<IF::Error>> {
        self.modem.delay_ms(timing::RESPONSE_SETTLE_MS);
        let Some(out) = out else {
            return Ok(0);
        };
        match self.modem.read_raw(out, timing::RAW_READ)? {
            0 => {
                modem_log!(self.modem.log, Level::Error, "no data from server");
                Err(ModemError::NoResponse { stage: "http response" })
            }
            n => Ok(n),
        }
    }
}

fn check_request_args(server: &str, path: &str, out: Option<&[u8]>) -> Result<(), Precondition> {
    if server.is_empty() || path.is_empty() || out.is_some_and(<[u8]>::is_empty) {
        return Err(Precondition::MissingArgument);
    }
    Ok(())
}
