use crate::parsers::html;

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en-GB">
<head>
  <title>  Sign in
     to Example </title>
  <meta name="description" content="Access your account">
  <script>var x = "<div class='fake'></div>";</script>
</head>
<body>
  <nav class="top-nav"><a href="/">Home</a><a href="/help">Help</a><a href="#content">Skip</a></nav>
  <main>
    <h1>Sign in</h1>
    <form action="/login" method="post">
      <input type="hidden" name="csrf" value="x">
      <input type="email" name="email">
      <input type="password" name="password">
      <button type="submit">Go</button>
    </form>
  </main>
  <footer><a href="/privacy">Privacy</a></footer>
</body>
</html>"##;

    #[test]
    fn test_extracts_metadata() {
        let extract = html::parse(LOGIN_PAGE);
        assert_eq!(extract.title.as_deref(), Some("Sign in to Example"));
        assert_eq!(extract.description.as_deref(), Some("Access your account"));
        assert_eq!(extract.language.as_deref(), Some("en-GB"));
    }

    #[test]
    fn test_counts_and_landmarks() {
        let extract = html::parse(LOGIN_PAGE);
        let s = &extract.structure;
        assert_eq!(s.forms, 1);
        // hidden inputs are not interactive
        assert_eq!(s.inputs, 2);
        assert_eq!(s.buttons, 1);
        assert_eq!(s.images, 0);
        assert_eq!(s.videos, 0);
        assert!(s.has_h1);
        assert!(s.has_nav);
        assert!(s.has_main);
        assert!(s.has_footer);
        assert!(s.has_password_input);
        assert!(!s.has_product_markers);
        assert!(!s.has_article_markers);
    }

    #[test]
    fn test_links_skip_fragments() {
        let extract = html::parse(LOGIN_PAGE);
        assert_eq!(extract.links, vec!["/", "/help", "/privacy"]);
        assert_eq!(extract.structure.links, 3);
    }

    #[test]
    fn test_product_and_article_markers() {
        let product = html::parse(
            r#"<html><body><div class="product-card"><span class="price">9</span></div></body></html>"#,
        );
        assert!(product.structure.has_product_markers);

        let article = html::parse(
            r#"<html><body><article><h1>Post</h1><p>text</p></article></body></html>"#,
        );
        assert!(article.structure.has_article_markers);
        assert!(!article.structure.has_product_markers);
    }

    #[test]
    fn test_videos_include_embeds() {
        let extract = html::parse(
            r#"<html><body><video src="a.mp4"></video><iframe src="https://www.youtube.com/embed/x"></iframe><iframe src="/map"></iframe></body></html>"#,
        );
        assert_eq!(extract.structure.videos, 2);
    }

    #[test]
    fn test_fingerprint_tokens() {
        let fp = html::fingerprint_html(
            r#"<html><body><div class="item-12 big"><p>a</p><script>x()</script><span class="Col3"></span></div></body></html>"#,
        )
        .unwrap();
        assert_eq!(fp, "div.item-N|p|span.colN");
    }

    #[test]
    fn test_fingerprint_generalizes_numbers() {
        let a = html::fingerprint_html(
            r#"<html><body><ul><li class="row-1"></li></ul></body></html>"#,
        );
        let b = html::fingerprint_html(
            r#"<html><body><ul><li class="row-99"></li></ul></body></html>"#,
        );
        assert_eq!(a, b);
        assert_eq!(html::generalize_class("grid-2x10"), "grid-NxN");
    }

    #[test]
    fn test_fingerprint_is_bounded() {
        let body = "<div></div>".repeat(500);
        let fp = html::fingerprint_html(&format!("<html><body>{body}</body></html>")).unwrap();
        assert_eq!(
            html::fingerprint_tokens(&fp).len(),
            html::FINGERPRINT_TOKEN_LIMIT
        );
    }

    #[test]
    fn test_empty_body_has_no_fingerprint() {
        assert!(html::fingerprint_html("<html><head></head><body></body></html>").is_none());
        let extract = html::parse("");
        assert!(extract.title.is_none());
        assert!(extract.fingerprint.is_none());
    }
}
