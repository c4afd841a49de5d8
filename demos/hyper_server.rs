use std::{convert::Infallible, net::SocketAddr};

use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::{BodyExt, Full};
use hyper::{body::Incoming, header::CONTENT_TYPE, Request, Response, StatusCode};
// Import the parted types.
use parted::{Constraints, Event, Multipart, SizeLimit, TokioStorage};

// A handler for incoming requests.
async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    // Reject the request before reading it if there is no boundary.
    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(64 * 1024 * 1024));
    let multipart = match Multipart::from_content_type(&content_type, constraints) {
        Ok(multipart) => multipart.storage(TokioStorage::new(std::env::temp_dir())),
        Err(err) => return Ok(reply(err.status_code(), err.to_string())),
    };

    match process_multipart(req.into_body(), multipart).await {
        Ok(summary) => Ok(reply(StatusCode::OK, summary)),
        Err(err) => Ok(reply(err.status_code(), err.to_string())),
    }
}

fn reply(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::from(body));
    *res.status_mut() = status;
    res
}

// Push the body frames into the parser as they arrive.
async fn process_multipart(mut body: Incoming, mut multipart: Multipart) -> parted::Result<String> {
    let mut summary = String::new();

    while let Some(frame) = body.frame().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                multipart.destroy();
                return Err(parted::Error::StreamReadFailed(err.into()));
            }
        };

        if let Ok(data) = frame.into_data() {
            if !multipart.write(&data) {
                break;
            }
        }

        while let Some(event) = multipart.next_event() {
            describe(event, &mut summary)?;
        }
    }

    multipart.end(None);

    // Waits until every uploaded file is flushed.
    while let Some(event) = multipart.next().await {
        describe(event, &mut summary)?;
    }

    Ok(summary)
}

fn describe(event: Event, summary: &mut String) -> parted::Result<()> {
    match event {
        Event::Part(part) => {
            let line = match part.path() {
                Some(path) => format!("{}: {:?} stored at {}\n", part.name(), part.file_name(), path.display()),
                None => format!("{}: {:?}\n", part.name(), part.text().unwrap_or_default()),
            };
            println!("{}", line.trim_end());
            summary.push_str(&line);
        }
        Event::Error(err) => return Err(err),
        Event::End => summary.push_str("done\n"),
        Event::Header { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    println!("Server running at: {}", addr);

    let service = hyper::service::service_fn(handle);

    loop {
        let (socket, _remote_addr) = listener.accept().await.unwrap();
        let socket = hyper_util::rt::TokioIo::new(socket);
        tokio::spawn(async move {
            if let Err(e) = hyper::server::conn::http1::Builder::new()
                .serve_connection(socket, service)
                .await
            {
                eprintln!("server error: {}", e);
            }
        });
    }
}
