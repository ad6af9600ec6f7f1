use http_client::Request;

/// Common Chrome user agent string for all requests
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Common Chrome headers for security info
const SEC_CH_UA: &str =
    "\"Not)A;Brand\";v=\"8\", \"Chromium\";v=\"138\", \"Google Chrome\";v=\"138\"";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

/// Add the headers a desktop browser sends with every request
pub fn add_common_headers(request: &mut Request) {
    let _ = request.insert_header("User-Agent", USER_AGENT);
    let _ = request.insert_header("Accept-Language", "en-US,en;q=0.9");
    let _ = request.insert_header("DNT", "1");
    let _ = request.insert_header("Connection", "keep-alive");
    let _ = request.insert_header("sec-ch-ua", SEC_CH_UA);
    let _ = request.insert_header("sec-ch-ua-mobile", "?0");
    let _ = request.insert_header("sec-ch-ua-platform", "\"Linux\"");
}

/// Add headers for a top-level page navigation
pub fn add_page_headers(request: &mut Request, referer_url: Option<&str>) {
    add_common_headers(request);
    let _ = request.insert_header("Accept", ACCEPT_HTML);
    let _ = request.insert_header("Upgrade-Insecure-Requests", "1");
    let _ = request.insert_header("Sec-Fetch-Dest", "document");
    let _ = request.insert_header("Sec-Fetch-Mode", "navigate");

    match referer_url {
        Some(referer) => {
            let _ = request.insert_header("Sec-Fetch-Site", "same-origin");
            let _ = request.insert_header("Referer", referer);
        }
        None => {
            let _ = request.insert_header("Sec-Fetch-Site", "none");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_types::{Method, Url};

    fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
        request.header(name).map(|values| values.last().as_str())
    }

    #[test]
    fn test_page_headers_with_referer() {
        let url = Url::parse("https://www.azlyrics.com/lyrics/a/b.html").unwrap();
        let mut request = Request::new(Method::Get, url);
        add_page_headers(&mut request, Some("https://www.azlyrics.com/b/bowie.html"));

        assert_eq!(header(&request, "User-Agent").unwrap(), USER_AGENT);
        assert_eq!(
            header(&request, "Referer"),
            Some("https://www.azlyrics.com/b/bowie.html")
        );
        assert_eq!(header(&request, "Sec-Fetch-Site"), Some("same-origin"));
    }

    #[test]
    fn test_page_headers_without_referer() {
        let url = Url::parse("https://www.azlyrics.com/").unwrap();
        let mut request = Request::new(Method::Get, url);
        add_page_headers(&mut request, None);

        assert!(header(&request, "Referer").is_none());
        assert_eq!(header(&request, "Sec-Fetch-Site"), Some("none"));
    }
}
