const SESSION_SLOT: &str = "__FORM_SESSION__";

/// The page bound to one form session.
pub fn index_html(session: &str) -> String {
    INDEX_HTML.replace(SESSION_SLOT, session)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="fr">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Analyse & Amélioration de Site</title>
  <style>
    * { box-sizing: border-box; }
    body {
      margin: 0;
      min-height: 100vh;
      display: flex;
      align-items: center;
      justify-content: center;
      padding: 16px;
      font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
      color: #1f2937;
      background: linear-gradient(135deg, #eff6ff, #ffffff, #f0fdf4);
    }
    .wrap { width: 100%; max-width: 600px; display: flex; flex-direction: column; gap: 24px; }
    header { text-align: center; }
    h1 {
      font-size: 34px;
      margin: 0 0 12px;
      background: linear-gradient(90deg, #2563eb, #16a34a);
      -webkit-background-clip: text;
      background-clip: text;
      color: transparent;
    }
    header p { color: #4b5563; font-size: 17px; margin: 0; }
    .card {
      background: rgba(255, 255, 255, 0.85);
      border-radius: 14px;
      box-shadow: 0 20px 25px -5px rgba(0, 0, 0, 0.1);
      padding: 20px;
    }
    .card h2 { text-align: center; margin: 0 0 6px; font-size: 22px; }
    .card .desc { text-align: center; color: #6b7280; margin: 0 0 18px; font-size: 14px; }
    label { display: block; text-align: center; font-weight: 500; margin-bottom: 6px; }
    input[type=url], input[type=file] {
      width: 100%;
      padding: 8px;
      border: 1px solid #d1d5db;
      border-radius: 6px;
      font: inherit;
    }
    .field { margin-bottom: 18px; }
    .count { text-align: center; color: #6b7280; font-size: 13px; margin: 6px 0 0; }
    .previews { display: grid; grid-template-columns: 1fr 1fr; gap: 8px; margin-top: 12px; }
    .preview { position: relative; }
    .preview img { width: 100%; height: 80px; object-fit: cover; border-radius: 6px; border: 1px solid #e5e7eb; }
    .preview p { font-size: 12px; color: #4b5563; margin: 4px 0 0; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }
    .remove {
      position: absolute; top: -8px; right: -8px;
      width: 22px; height: 22px;
      border: 0; border-radius: 50%;
      background: #ef4444; color: #fff; cursor: pointer;
    }
    button.primary {
      width: 100%;
      padding: 12px 24px;
      border: 0;
      border-radius: 12px;
      font: inherit;
      font-weight: 600;
      color: #fff;
      background: linear-gradient(90deg, #2563eb, #16a34a);
      cursor: pointer;
    }
    button.primary:disabled { opacity: 0.7; cursor: progress; }
    .results-head {
      margin: -20px -20px 16px;
      padding: 18px;
      border-radius: 14px 14px 0 0;
      background: linear-gradient(90deg, #16a34a, #15803d);
      color: #fff;
      text-align: center;
      font-weight: 600;
    }
    pre {
      background: #f9fafb;
      border-radius: 8px;
      padding: 16px;
      white-space: pre-wrap;
      word-break: break-word;
      font-size: 14px;
      margin: 0 0 16px;
    }
    button.outline {
      width: 100%;
      padding: 8px;
      border: 1px solid #bbf7d0;
      border-radius: 8px;
      background: #fff;
      color: #15803d;
      font: inherit;
      cursor: pointer;
    }
    .footer { text-align: center; color: #6b7280; font-size: 14px; }
    [hidden] { display: none !important; }
  </style>
</head>
<body>
  <div class="wrap">
    <header>
      <h1>Analyse & Amélioration de Site</h1>
      <p>Obtenez une analyse détaillée de votre site web et des suggestions d'amélioration générées par IA</p>
    </header>

    <section class="card">
      <h2>Analysez votre site</h2>
      <p class="desc">Entrez l'URL de votre site et téléchargez jusqu'à 4 captures d'écran (obligatoire)</p>
      <form id="form">
        <div class="field">
          <label for="url">URL du site</label>
          <input id="url" type="url" placeholder="https://votresite.com" required />
        </div>
        <div class="field">
          <label for="screenshots">Captures d'écran (obligatoire - max 4)</label>
          <input id="screenshots" type="file" accept="image/*" multiple />
          <p class="count" id="count">0/4 images sélectionnées</p>
          <div class="previews" id="previews"></div>
        </div>
        <button class="primary" id="submit" type="submit">Analyser le site</button>
      </form>
    </section>

    <section class="card" id="results" hidden>
      <div class="results-head">Résultats de l'analyse</div>
      <pre id="result-text"></pre>
      <button class="outline" id="copy" type="button">Copier les résultats</button>
    </section>

    <div class="footer" id="footer">
      <p>Prêt à optimiser votre présence en ligne ? Commencez par analyser votre site.</p>
    </div>
  </div>

  <script>
    const els = {
      form: document.getElementById('form'),
      url: document.getElementById('url'),
      files: document.getElementById('screenshots'),
      count: document.getElementById('count'),
      previews: document.getElementById('previews'),
      submit: document.getElementById('submit'),
      results: document.getElementById('results'),
      resultText: document.getElementById('result-text'),
      copy: document.getElementById('copy'),
      footer: document.getElementById('footer'),
    };
    const api = '/api/form/__FORM_SESSION__';
    let revision = 0;

    async function call(method, path, body) {
      const init = { method };
      if (body instanceof FormData) {
        init.body = body;
      } else if (body !== undefined) {
        init.headers = { 'content-type': 'application/json' };
        init.body = JSON.stringify(body);
      }
      const response = await fetch(path, init);
      const data = await response.json().catch(() => ({}));
      if (!response.ok) {
        throw new Error(data.detail || 'Une erreur est survenue lors de l\'analyse');
      }
      return data;
    }

    function render(view) {
      revision += 1;
      const n = view.screenshots.length;
      els.count.textContent = `${n}/${view.max_screenshots} images sélectionnées`;
      els.files.disabled = n >= view.max_screenshots;
      els.previews.replaceChildren(...view.screenshots.map((shot) => {
        const item = document.createElement('div');
        item.className = 'preview';
        const img = document.createElement('img');
        img.src = `${api}/screenshots/${shot.index}?r=${revision}`;
        img.alt = `Capture ${shot.index + 1}`;
        const remove = document.createElement('button');
        remove.type = 'button';
        remove.className = 'remove';
        remove.textContent = '×';
        remove.onclick = () => act(() => call('DELETE', `${api}/screenshots/${shot.index}`));
        const name = document.createElement('p');
        name.textContent = shot.file_name;
        item.append(img, remove, name);
        return item;
      }));
      showLoading(view.loading);
      els.results.hidden = !view.result_text;
      els.resultText.textContent = view.result_text;
      els.copy.textContent = view.copied ? 'Copié !' : 'Copier les résultats';
      els.footer.hidden = Boolean(view.result_text) || view.loading;
    }

    function showLoading(loading) {
      els.submit.disabled = loading;
      els.submit.textContent = loading ? 'Analyse en cours...' : 'Analyser le site';
      if (loading) els.footer.hidden = true;
    }

    async function refresh() {
      render(await call('GET', api));
    }

    async function act(action) {
      try {
        const view = await action();
        if (view && view.screenshots) {
          render(view);
        } else {
          await refresh();
        }
      } catch (error) {
        alert(error.message);
        await refresh().catch(() => {});
      }
    }

    els.url.addEventListener('change', () => act(() => call('PUT', `${api}/url`, { url: els.url.value })));

    els.files.addEventListener('change', () => {
      const files = Array.from(els.files.files || []);
      els.files.value = '';
      if (files.length === 0) return;
      const body = new FormData();
      files.forEach((file) => body.append('screenshots', file, file.name));
      act(() => call('POST', `${api}/screenshots`, body));
    });

    els.form.addEventListener('submit', (event) => {
      event.preventDefault();
      act(async () => {
        await call('PUT', `${api}/url`, { url: els.url.value });
        showLoading(true);
        try {
          await call('POST', `${api}/submit`);
        } finally {
          showLoading(false);
        }
      });
    });

    els.copy.addEventListener('click', () => act(async () => {
      const copied = await call('POST', `${api}/copy`);
      if (navigator.clipboard) {
        await navigator.clipboard.writeText(copied.text).catch(() => {});
      }
      setTimeout(() => refresh().catch(() => {}), 2100);
    }));

    refresh().catch(() => {});
  </script>
</body>
</html>
"#;
