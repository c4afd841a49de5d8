use tokio::io::AsyncRead;
// Import parted types.
use parted::Multipart;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate an `AsyncRead` and the boundary from somewhere e.g. server request body.
    let (reader, boundary) = get_async_reader_from_somewhere().await;

    // Parse the whole body. File parts land in the system temporary directory.
    let form = Multipart::new(boundary)?.parse_reader(reader).await?;

    for part in form.parts() {
        println!("Name: {:?}, File Name: {:?}", part.name(), part.file_name());

        match part.path() {
            Some(path) => println!("Stored at: {}", path.display()),
            None => println!("Content: {:?}", part.text()),
        }
    }

    Ok(())
}

// Generate an `AsyncRead` and the boundary from somewhere e.g. server request body.
async fn get_async_reader_from_somewhere() -> (impl AsyncRead, &'static str) {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"My Field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"File Field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";

    (data.as_bytes(), "X-BOUNDARY")
}
