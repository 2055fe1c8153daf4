use std::sync::atomic::{AtomicU64, Ordering};

use rand::distr::Alphanumeric;
use rand::Rng;
use rsip::{Header, Param, Request, SipMessage};

use crate::error::Error;
use crate::gateway::Transport;

/// Process-wide monotonic `CSeq` counter.
///
/// Encapsulated as a component owned by [`crate::registry::Registry`] and
/// exposed only through [`CSeqCounter::next`], rather than a bare global
/// counter. A 64-bit counter avoids any rollover concern at 2^31 - 1.
#[derive(Default)]
pub struct CSeqCounter(AtomicU64);

impl CSeqCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Generates a fresh SIP tag for dialog-establishing requests.
pub fn make_tag() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

fn transport_label(t: Transport) -> &'static str {
    match t {
        Transport::Udp => "UDP",
        Transport::Tcp => "TCP",
        Transport::Tls => "TLS",
        Transport::Ws => "WS",
        Transport::Wss => "WSS",
    }
}

/// Everything [`build_register`] needs to construct one GIN `REGISTER`.
pub struct RegisterParams<'a> {
    pub username: &'a str,
    pub gateway_ref: &'a str,
    pub gateway_host: &'a str,
    pub transport: Transport,
    pub contact_host: std::net::IpAddr,
    pub contact_port: u16,
    pub via_host: std::net::IpAddr,
    pub via_port: u16,
    pub call_id: rsip::headers::CallId,
    pub cseq: u64,
    pub expires: u32,
    pub user_agent: &'a str,
}

/// Builds a GIN-style bulk `REGISTER` request (RFC 3261 + RFC 6140).
///
/// The wire shape is fixed by the gateway registration wire format and
/// must not drift: a Contact `bnc` parameter with no value is the
/// compatibility-critical byte sequence Kamailio/Asterisk/FreeSWITCH GIN
/// registrars key off of, and `Require`/`Proxy-Require: gin` must both be
/// present. `Allow` is emitted as six separate headers (one per method, in
/// the fixed order below) rather than a single comma-joined header line —
/// a deliberate deviation from the otherwise-compact RFC 3261 convention
/// that some GIN registrars expect.
pub fn build_register(p: &RegisterParams) -> Result<Request, Error> {
    let request_uri: rsip::Uri = format!("sip:{}", p.gateway_host).try_into()?;
    let to_uri: rsip::Uri = format!("sip:{}@{}", p.username, p.gateway_host).try_into()?;

    let to = rsip::typed::To {
        display_name: None,
        uri: to_uri.clone(),
        params: vec![],
    };
    let from = rsip::typed::From {
        display_name: None,
        uri: to_uri,
        params: vec![],
    }
    .with_tag(make_tag());

    // Raw Via line: the sent-by host/port this resolver computed, with an
    // empty `rport` parameter so the registrar echoes back the source port
    // it actually observed (RFC 3581).
    let via_value = format!(
        "SIP/2.0/{} {}:{};rport",
        transport_label(p.transport),
        p.via_host,
        p.via_port
    );

    let contact_uri = rsip::Uri {
        scheme: Some(rsip::Scheme::Sip),
        auth: Some(rsip::auth::Auth {
            user: p.username.to_string(),
            password: None,
        }),
        host_with_port: (p.contact_host, p.contact_port).into(),
        params: vec![],
        headers: vec![],
    };
    let contact = rsip::typed::Contact {
        display_name: None,
        uri: contact_uri,
        params: vec![Param::Other("bnc".into(), None)],
    };

    let mut headers: Vec<Header> = vec![
        Header::Via(via_value.into()),
        Header::CallId(p.call_id.clone()),
        Header::From(from.into()),
        Header::To(to.into()),
        Header::CSeq(
            rsip::typed::CSeq {
                seq: p.cseq as u32,
                method: rsip::Method::Register,
            }
            .into(),
        ),
        Header::Contact(contact.into()),
        Header::Expires(p.expires.into()),
        Header::MaxForwards(70.into()),
        Header::ProxyRequire("gin".into()),
        Header::Require("gin".into()),
        Header::Supported("path".into()),
    ];

    for method in ["INVITE", "ACK", "BYE", "CANCEL", "REGISTER", "OPTIONS"] {
        headers.push(Header::Allow(method.into()));
    }

    headers.push(Header::UserAgent(p.user_agent.to_string().into()));
    headers.push(Header::Other(
        "X-Gateway-Ref".into(),
        p.gateway_ref.to_string(),
    ));

    Ok(Request {
        method: rsip::Method::Register,
        uri: request_uri,
        headers: headers.into(),
        body: vec![],
        version: rsip::Version::V2,
    })
}

/// Serializes a built request the way the dispatcher logs it at debug
/// level before handing it to the SIP provider.
pub fn render(request: Request) -> String {
    SipMessage::from(request).to_string()
}
