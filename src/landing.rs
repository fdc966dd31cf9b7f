use axum::response::Html;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8" />
    <title>File Upload</title>
  </head>
  <body>
    <h2>File Upload</h2>
    <form action="/upload" method="POST" enctype="multipart/form-data">
      <input type="file" name="file" required />
      <button type="submit">Upload</button>
    </form>
    <h3>Uploaded Files:</h3>
    <ul id="file-list"></ul>
    <script>
      async function fetchFiles() {
        const response = await fetch('/files');
        const files = await response.json();
        const list = document.getElementById('file-list');
        list.replaceChildren(...files.map(file => {
          const link = document.createElement('a');
          link.href = '/uploads/' + encodeURIComponent(file);
          link.target = '_blank';
          link.textContent = file;
          const item = document.createElement('li');
          item.appendChild(link);
          return item;
        }));
      }
      fetchFiles();
    </script>
  </body>
</html>
"#;

pub async fn landing_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}
